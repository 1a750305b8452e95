//! GPU-less backend.
//!
//! Records every command and tracks which resources are alive, so pipeline
//! behavior (draw order, uniform values, leaks, recreation) can be asserted
//! without a device. Resource failures can be injected.

use std::collections::BTreeSet;

use crate::camera::CameraFrame;
use crate::coords::FrameSize;
use crate::error::ResourceError;
use crate::render::QuadShader;

use super::{
    ClearColor, DrawDest, FrameAcquire, FrameTextureDesc, GpuBackend, QuadUniforms, QuadVertex,
};

/// Identifies a resource created by a [`HeadlessBackend`].
pub type ResourceId = u64;

#[derive(Debug)]
pub struct HeadlessTexture {
    id: ResourceId,
    size: FrameSize,
    last_sequence: Option<u64>,
}

impl HeadlessTexture {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Current allocation size.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Sequence number of the last uploaded frame.
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }
}

#[derive(Debug)]
pub struct HeadlessProgram {
    id: ResourceId,
    vertex_count: usize,
    index_count: usize,
}

impl HeadlessProgram {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

#[derive(Debug)]
pub struct HeadlessTarget {
    id: ResourceId,
    size: FrameSize,
}

impl HeadlessTarget {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }
}

/// Destination of a recorded pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DestKind {
    Surface,
    Offscreen(ResourceId),
}

impl DestKind {
    fn of(dest: DrawDest<'_, HeadlessTarget>) -> Self {
        match dest {
            DrawDest::Surface => Self::Surface,
            DrawDest::Offscreen(t) => Self::Offscreen(t.id),
        }
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTexture { id: ResourceId, desc: FrameTextureDesc },
    Upload { texture: ResourceId, size: FrameSize, sequence: u64 },
    DestroyTexture(ResourceId),
    CreateProgram(ResourceId),
    DestroyProgram(ResourceId),
    CreateTarget { id: ResourceId, size: FrameSize },
    DestroyTarget(ResourceId),
    BeginFrame,
    Clear { dest: DestKind, color: ClearColor },
    Draw {
        dest: DestKind,
        program: ResourceId,
        texture: ResourceId,
        uniforms: QuadUniforms,
    },
    EndFrame,
}

/// Recording backend. See the module docs.
#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: ResourceId,
    max_dimension: u32,
    skip_frames: u32,
    frame_open: bool,
    live_textures: BTreeSet<ResourceId>,
    live_programs: BTreeSet<ResourceId>,
    live_targets: BTreeSet<ResourceId>,
    commands: Vec<Command>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self {
            next_id: 1,
            max_dimension: 8192,
            skip_frames: 0,
            frame_open: false,
            live_textures: BTreeSet::new(),
            live_programs: BTreeSet::new(),
            live_targets: BTreeSet::new(),
            commands: Vec::new(),
        }
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest texture/target dimension accepted, like a device limit.
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max;
        self
    }

    /// Makes the next `n` `begin_frame` calls report [`FrameAcquire::Skip`].
    pub fn skip_next_frames(&mut self, n: u32) {
        self.skip_frames = n;
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn live_textures(&self) -> usize {
        self.live_textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.live_programs.len()
    }

    pub fn live_targets(&self) -> usize {
        self.live_targets.len()
    }

    /// True when nothing created by this backend is still alive.
    pub fn is_empty(&self) -> bool {
        self.live_textures.is_empty() && self.live_programs.is_empty() && self.live_targets.is_empty()
    }

    fn allocate(&mut self) -> ResourceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_size(&self, what: &'static str, size: FrameSize) -> Result<(), ResourceError> {
        if !size.is_valid() {
            return Err(ResourceError::EmptyAllocation { what, size });
        }
        if size.width > self.max_dimension || size.height > self.max_dimension {
            return Err(ResourceError::TooLarge {
                what,
                size,
                limit: self.max_dimension,
            });
        }
        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    type FrameTexture = HeadlessTexture;
    type QuadProgram = HeadlessProgram;
    type Target = HeadlessTarget;

    fn create_frame_texture(
        &mut self,
        desc: &FrameTextureDesc,
    ) -> Result<HeadlessTexture, ResourceError> {
        self.check_size("frame texture", desc.size)?;
        let id = self.allocate();
        self.live_textures.insert(id);
        self.commands.push(Command::CreateTexture { id, desc: *desc });
        Ok(HeadlessTexture {
            id,
            size: desc.size,
            last_sequence: None,
        })
    }

    fn upload_frame(
        &mut self,
        texture: &mut HeadlessTexture,
        frame: &CameraFrame,
    ) -> Result<(), ResourceError> {
        if !self.live_textures.contains(&texture.id) {
            return Err(ResourceError::Released("frame texture"));
        }
        self.check_size("frame texture", frame.size())?;
        super::check_row_stride(frame)?;
        texture.size = frame.size();
        texture.last_sequence = Some(frame.sequence());
        self.commands.push(Command::Upload {
            texture: texture.id,
            size: frame.size(),
            sequence: frame.sequence(),
        });
        Ok(())
    }

    fn destroy_frame_texture(&mut self, texture: HeadlessTexture) {
        self.live_textures.remove(&texture.id);
        self.commands.push(Command::DestroyTexture(texture.id));
    }

    fn create_quad_program(
        &mut self,
        _shader: &QuadShader,
        vertices: &[QuadVertex],
        indices: &[u16],
    ) -> Result<HeadlessProgram, ResourceError> {
        let id = self.allocate();
        self.live_programs.insert(id);
        self.commands.push(Command::CreateProgram(id));
        Ok(HeadlessProgram {
            id,
            vertex_count: vertices.len(),
            index_count: indices.len(),
        })
    }

    fn destroy_quad_program(&mut self, program: HeadlessProgram) {
        self.live_programs.remove(&program.id);
        self.commands.push(Command::DestroyProgram(program.id));
    }

    fn create_target(&mut self, size: FrameSize) -> Result<HeadlessTarget, ResourceError> {
        self.check_size("offscreen target", size)?;
        let id = self.allocate();
        self.live_targets.insert(id);
        self.commands.push(Command::CreateTarget { id, size });
        Ok(HeadlessTarget { id, size })
    }

    fn destroy_target(&mut self, target: HeadlessTarget) {
        self.live_targets.remove(&target.id);
        self.commands.push(Command::DestroyTarget(target.id));
    }

    fn begin_frame(&mut self) -> Result<FrameAcquire, ResourceError> {
        if self.skip_frames > 0 {
            self.skip_frames -= 1;
            return Ok(FrameAcquire::Skip);
        }
        self.frame_open = true;
        self.commands.push(Command::BeginFrame);
        Ok(FrameAcquire::Ready)
    }

    fn clear(&mut self, dest: DrawDest<'_, HeadlessTarget>, color: ClearColor) {
        self.commands.push(Command::Clear {
            dest: DestKind::of(dest),
            color,
        });
    }

    fn draw_quad(
        &mut self,
        dest: DrawDest<'_, HeadlessTarget>,
        program: &HeadlessProgram,
        texture: &HeadlessTexture,
        uniforms: &QuadUniforms,
    ) {
        self.commands.push(Command::Draw {
            dest: DestKind::of(dest),
            program: program.id,
            texture: texture.id,
            uniforms: *uniforms,
        });
    }

    fn end_frame(&mut self) {
        if std::mem::take(&mut self.frame_open) {
            self.commands.push(Command::EndFrame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FilterMode;

    #[test]
    fn tracks_resource_lifetimes() {
        let mut gpu = HeadlessBackend::new();
        let tex = gpu
            .create_frame_texture(&FrameTextureDesc::camera(FrameSize::new(4, 4), FilterMode::Linear))
            .unwrap();
        let target = gpu.create_target(FrameSize::new(4, 4)).unwrap();
        assert_eq!(gpu.live_textures(), 1);
        assert_eq!(gpu.live_targets(), 1);

        gpu.destroy_frame_texture(tex);
        gpu.destroy_target(target);
        assert!(gpu.is_empty());
    }

    #[test]
    fn oversized_target_fails() {
        let mut gpu = HeadlessBackend::new().with_max_dimension(1024);
        let err = gpu.create_target(FrameSize::new(2048, 16)).unwrap_err();
        assert!(matches!(err, ResourceError::TooLarge { limit: 1024, .. }));
        assert!(gpu.is_empty());
    }

    #[test]
    fn skipped_frames_do_not_record() {
        let mut gpu = HeadlessBackend::new();
        gpu.skip_next_frames(1);
        assert_eq!(gpu.begin_frame().unwrap(), FrameAcquire::Skip);
        gpu.end_frame();
        assert!(gpu.commands().is_empty());
        assert_eq!(gpu.begin_frame().unwrap(), FrameAcquire::Ready);
        gpu.end_frame();
        assert_eq!(gpu.commands(), &[Command::BeginFrame, Command::EndFrame]);
    }

    #[test]
    fn odd_row_stride_is_rejected() {
        let mut gpu = HeadlessBackend::new();
        let size = FrameSize::new(2, 2);
        let mut tex = gpu
            .create_frame_texture(&FrameTextureDesc::camera(size, FilterMode::Nearest))
            .unwrap();
        let frame = CameraFrame::rgba8_strided(size, 10, vec![0u8; 18]).unwrap();

        let err = gpu.upload_frame(&mut tex, &frame).unwrap_err();
        assert!(matches!(err, ResourceError::Upload(_)));
        assert_eq!(tex.last_sequence(), None);
    }
}
