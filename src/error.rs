use thiserror::Error;

/// Failures while fetching or decoding level assets. All of them are
/// logged and leave the dependent feature inert for the session.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {path}: {message}")]
    Fetch { path: String, message: String },

    #[error("failed to parse scene {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },

    #[error("scene {path} has no mesh data for primitive in '{node}'")]
    MissingGeometry { path: String, node: String },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("audio error for {path}: {message}")]
    Audio { path: String, message: String },
}

/// Failures while bringing up the GPU; fatal for the session
#[derive(Debug, Error)]
pub enum GpuInitError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
