use crate::backend::{DrawDest, GpuBackend, QuadUniforms, QuadVertex};
use crate::camera::TexTransform;
use crate::error::ResourceError;
use crate::projection::ProjectionMatrix;

use super::QuadShader;

/// Full-viewport quad in NDC with matching UV corners, in fan order.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 0.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 1.0] },
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 1.0] },
];

/// Fan triangulation of [`QUAD_VERTICES`]; the topology has no native fan mode.
pub const QUAD_FAN_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Draws the camera texture through a textured quad.
///
/// Holds no per-draw state: every `draw` sets both matrices from its arguments.
pub struct QuadRenderer<B: GpuBackend> {
    program: Option<B::QuadProgram>,
}

impl<B: GpuBackend> Default for QuadRenderer<B> {
    fn default() -> Self {
        Self { program: None }
    }
}

impl<B: GpuBackend> QuadRenderer<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.program.is_some()
    }

    /// Validates `shader` and builds the program and static mesh.
    ///
    /// Re-initializing releases the previous program first.
    pub fn init(&mut self, gpu: &mut B, shader: &QuadShader) -> Result<(), ResourceError> {
        shader.validate()?;
        self.dispose(gpu);

        let program = gpu.create_quad_program(shader, &QUAD_VERTICES, &QUAD_FAN_INDICES)?;
        self.program = Some(program);
        log::debug!("quad renderer initialized with shader `{}`", shader.label());
        Ok(())
    }

    /// Draws `texture` into `dest`.
    pub fn draw(
        &self,
        gpu: &mut B,
        dest: DrawDest<'_, B::Target>,
        texture: &B::FrameTexture,
        tex_transform: &TexTransform,
        projection: &ProjectionMatrix,
    ) -> Result<(), ResourceError> {
        let program = self
            .program
            .as_ref()
            .ok_or(ResourceError::Released("quad program"))?;

        let uniforms = QuadUniforms {
            tex_matrix: tex_transform.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        };
        gpu.draw_quad(dest, program, texture, &uniforms);
        Ok(())
    }

    /// Releases the program and mesh. Idempotent.
    pub fn dispose(&mut self, gpu: &mut B) {
        if let Some(program) = self.program.take() {
            gpu.destroy_quad_program(program);
            log::debug!("quad renderer disposed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FilterMode, FrameTextureDesc};
    use crate::backend::headless::{Command, DestKind, HeadlessBackend};
    use crate::coords::FrameSize;

    #[test]
    fn draw_sets_both_matrices() {
        let mut gpu = HeadlessBackend::new();
        let mut quad = QuadRenderer::new();
        quad.init(&mut gpu, &QuadShader::builtin()).unwrap();
        let tex = gpu
            .create_frame_texture(&FrameTextureDesc::camera(FrameSize::new(8, 8), FilterMode::Linear))
            .unwrap();
        gpu.take_commands();

        let transform = TexTransform::vertical_flip();
        let projection = ProjectionMatrix::IDENTITY;
        quad.draw(&mut gpu, DrawDest::Surface, &tex, &transform, &projection)
            .unwrap();

        match gpu.commands() {
            [Command::Draw { dest, texture, uniforms, .. }] => {
                assert_eq!(*dest, DestKind::Surface);
                assert_eq!(*texture, tex.id());
                assert_eq!(uniforms.tex_matrix, transform.to_cols_array_2d());
                assert_eq!(uniforms.projection, projection.to_cols_array_2d());
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn mesh_is_a_four_vertex_fan() {
        let mut gpu = HeadlessBackend::new();
        let mut quad: QuadRenderer<HeadlessBackend> = QuadRenderer::new();
        quad.init(&mut gpu, &QuadShader::builtin()).unwrap();
        let program = quad.program.as_ref().unwrap();
        assert_eq!(program.vertex_count(), 4);
        assert_eq!(program.index_count(), 6);
    }

    #[test]
    fn broken_shader_creates_nothing() {
        let mut gpu = HeadlessBackend::new();
        let mut quad: QuadRenderer<HeadlessBackend> = QuadRenderer::new();
        let err = quad
            .init(&mut gpu, &QuadShader::from_wgsl("bad", "not wgsl"))
            .unwrap_err();
        assert!(matches!(err, ResourceError::ShaderCompile { .. }));
        assert!(!quad.is_initialized());
        assert!(gpu.is_empty());
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut gpu = HeadlessBackend::new();
        let mut quad: QuadRenderer<HeadlessBackend> = QuadRenderer::new();
        quad.init(&mut gpu, &QuadShader::builtin()).unwrap();
        quad.dispose(&mut gpu);
        quad.dispose(&mut gpu);
        assert!(gpu.is_empty());
        let destroys = gpu
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::DestroyProgram(_)))
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn draw_after_dispose_fails() {
        let mut gpu = HeadlessBackend::new();
        let mut quad = QuadRenderer::new();
        quad.init(&mut gpu, &QuadShader::builtin()).unwrap();
        let tex = gpu
            .create_frame_texture(&FrameTextureDesc::camera(FrameSize::new(8, 8), FilterMode::Linear))
            .unwrap();
        quad.dispose(&mut gpu);
        let err = quad
            .draw(
                &mut gpu,
                DrawDest::Surface,
                &tex,
                &TexTransform::IDENTITY,
                &ProjectionMatrix::IDENTITY,
            )
            .unwrap_err();
        assert!(matches!(err, ResourceError::Released("quad program")));
    }
}
