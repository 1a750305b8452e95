use std::borrow::Cow;

use crate::error::ResourceError;

/// WGSL source for the camera quad program.
///
/// Must declare `vs_main`/`fs_main` and the bind layout of the built-in
/// `shaders/quad.wgsl`: uniforms at group 0, texture + sampler at group 1.
#[derive(Debug, Clone)]
pub struct QuadShader {
    label: Cow<'static, str>,
    wgsl: Cow<'static, str>,
}

impl QuadShader {
    pub const VERTEX_ENTRY: &'static str = "vs_main";
    pub const FRAGMENT_ENTRY: &'static str = "fs_main";

    pub fn builtin() -> Self {
        Self::from_wgsl("camview quad", include_str!("shaders/quad.wgsl"))
    }

    pub fn from_wgsl(
        label: impl Into<Cow<'static, str>>,
        wgsl: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            label: label.into(),
            wgsl: wgsl.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn wgsl(&self) -> &str {
        &self.wgsl
    }

    /// Parses and validates the module and checks both entry points exist.
    ///
    /// Runs on the CPU so that a broken shader is reported as an error on every
    /// backend instead of surfacing as a device validation failure.
    pub fn validate(&self) -> Result<(), ResourceError> {
        let compile_error = |message: String| ResourceError::ShaderCompile {
            label: self.label.to_string(),
            message,
        };

        let module = naga::front::wgsl::parse_str(&self.wgsl)
            .map_err(|e| compile_error(e.emit_to_string(&self.wgsl)))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(&self.wgsl)))?;

        let entries = [
            (Self::VERTEX_ENTRY, naga::ShaderStage::Vertex),
            (Self::FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
        ];
        for (entry, stage) in entries {
            let found = module
                .entry_points
                .iter()
                .any(|ep| ep.name == entry && ep.stage == stage);
            if !found {
                return Err(ResourceError::MissingEntryPoint {
                    label: self.label.to_string(),
                    entry,
                });
            }
        }

        Ok(())
    }
}

impl Default for QuadShader {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shader_validates() {
        QuadShader::builtin().validate().unwrap();
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = QuadShader::from_wgsl("broken", "fn vs_main( {").validate().unwrap_err();
        match err {
            ResourceError::ShaderCompile { label, message } => {
                assert_eq!(label, "broken");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn type_error_is_reported() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        let err = QuadShader::from_wgsl("mistyped", src).validate().unwrap_err();
        assert!(matches!(err, ResourceError::ShaderCompile { .. }));
    }

    #[test]
    fn missing_vertex_entry_is_reported() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = QuadShader::from_wgsl("fragment only", src).validate().unwrap_err();
        assert!(matches!(
            err,
            ResourceError::MissingEntryPoint { entry: "vs_main", .. }
        ));
    }
}
