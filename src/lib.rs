pub mod error;
pub mod version;
pub mod container;
pub mod codec;
mod metadata;
pub mod texture;
pub mod mesh;
pub mod environment;

pub use error::{AssetError, Result};
pub use version::{pack_version, unpack_version, major_version, minor_version, patch_version};
pub use version::{ITEX_VERSION, MESH_VERSION, IENV_VERSION};
pub use container::{AssetFile, AssetType, save_binary_file, load_binary_file};
pub use codec::{CompressionMode, CompressionPolicy};
pub use texture::{TextureInfo, TextureFormat, ColorSpace, read_texture_info, unpack_texture, pack_texture, pack_texture_with_policy};
pub use mesh::{MeshInfo, VertexFormat, PNTV32Vertex, read_mesh_info, unpack_mesh, pack_mesh};
pub use environment::{EnvironmentInfo, read_environment_info, unpack_environment, pack_environment};
