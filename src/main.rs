use assetlib::codec::{CompressionMode, CompressionPolicy, DEFAULT_MAX_COMPRESSION_RATIO};
use assetlib::container::HEADER_SIZE;
use assetlib::error::tag_str;
use assetlib::version::format_version;
use assetlib::{
    load_binary_file, pack_environment, pack_mesh, pack_texture_with_policy, read_environment_info,
    read_mesh_info, read_texture_info, save_binary_file, unpack_environment, unpack_mesh,
    unpack_texture, AssetFile, AssetType, ColorSpace, EnvironmentInfo, MeshInfo, TextureInfo,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "assetlib", about = "Inspect and build ITEX / MESH / IENV asset containers")]
struct Cli {
    /// Log pack/unpack decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the container header and metadata
    Info {
        input: PathBuf,
    },
    /// Decode every segment into scratch buffers
    Verify {
        input: PathBuf,
    },
    /// Decode an asset into raw .bin files
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Pack raw RGBA8 pixels into an ITEX container
    PackTexture {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Color space: srgb or rgb
        #[arg(long, default_value = "rgb")]
        color_space: String,
        #[arg(long, default_value = "1")]
        mip_levels: u32,
        /// Compression: lz4 (default) or none
        #[arg(short, long, default_value = "lz4")]
        compression: String,
        /// Store raw pixels when compressed/original exceeds this ratio
        #[arg(long, default_value_t = DEFAULT_MAX_COMPRESSION_RATIO)]
        max_ratio: f64,
    },
    /// Pack raw PNTV32 vertices and indices into a MESH container
    PackMesh {
        #[arg(long)]
        vertices: PathBuf,
        #[arg(long)]
        indices: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "32")]
        index_bits: u8,
        #[arg(short, long, default_value = "lz4")]
        compression: String,
    },
    /// Pack HDR, irradiance and specular data into an IENV container
    PackEnv {
        #[arg(long)]
        hdr: PathBuf,
        #[arg(long)]
        irradiance: PathBuf,
        #[arg(long)]
        specular: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long)]
        irradiance_size: u32,
        #[arg(long)]
        specular_size: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let file = load_binary_file(&input)?;
            println!("── Asset container ──────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Type tag       {}", tag_str(&file.type_tag));
            println!("  Version        {}", format_version(file.version));
            match file.asset_type() {
                Ok(ty) => println!("  Asset type     {}", ty.name()),
                Err(e) => println!("  Asset type     unsupported ({e})"),
            }
            println!("  Header         {} B", HEADER_SIZE);
            println!("  Metadata       {} B", file.metadata.len());
            println!("  Payload        {} B", file.payload.len());
            match serde_json::from_str::<serde_json::Value>(&file.metadata) {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_)   => println!("{}", file.metadata),
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let file = load_binary_file(&input)?;
            let segments = decode(&file)?;
            let total: usize = segments.iter().map(|(_, data)| data.len()).sum();
            println!("OK  {}  {} segment(s), {} B decoded", input.display(), segments.len(), total);
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir } => {
            let file = load_binary_file(&input)?;
            std::fs::create_dir_all(&output_dir)?;
            for (name, data) in decode(&file)? {
                let path = output_dir.join(name);
                std::fs::write(&path, &data)?;
                println!("  wrote  {} ({} B)", path.display(), data.len());
            }
        }

        // ── Pack texture ─────────────────────────────────────────────────────
        Commands::PackTexture { input, output, width, height, color_space, mip_levels, compression, max_ratio } => {
            let pixels = std::fs::read(&input)?;
            let color_space = match color_space.to_lowercase().as_str() {
                "srgb" => ColorSpace::SRGB,
                "rgb"  => ColorSpace::RGB,
                other  => return Err(format!("Unknown color space '{other}'").into()),
            };
            let info = TextureInfo {
                mip_levels,
                compression: parse_compression(&compression)?,
                ..TextureInfo::rgba8(width, height, color_space)
            };
            let file = pack_texture_with_policy(&info, &pixels, &CompressionPolicy::new(max_ratio)?)?;
            write_asset(&output, &file, pixels.len())?;
        }

        // ── Pack mesh ────────────────────────────────────────────────────────
        Commands::PackMesh { vertices, indices, output, index_bits, compression } => {
            let vertex_data = std::fs::read(&vertices)?;
            let index_data = std::fs::read(&indices)?;
            let mut info = MeshInfo {
                compression: parse_compression(&compression)?,
                index_bits,
                ..MeshInfo::default()
            };
            let vertex_size = info.format.vertex_byte_size();
            let index_size = (index_bits as usize / 8).max(1);
            if vertex_data.len() % vertex_size != 0 || index_data.len() % index_size != 0 {
                return Err("Vertex/index file sizes are not whole multiples of the element size".into());
            }
            info.vertex_count = u32::try_from(vertex_data.len() / vertex_size)?;
            info.index_count = u32::try_from(index_data.len() / index_size)?;
            let file = pack_mesh(&info, &vertex_data, &index_data)?;
            write_asset(&output, &file, vertex_data.len() + index_data.len())?;
        }

        // ── Pack environment ─────────────────────────────────────────────────
        Commands::PackEnv { hdr, irradiance, specular, output, width, height, irradiance_size, specular_size } => {
            let hdr = std::fs::read(&hdr)?;
            let irradiance = std::fs::read(&irradiance)?;
            let specular = std::fs::read(&specular)?;
            let info = EnvironmentInfo {
                hdr_extents: [width, height],
                hdr_bytes: u32::try_from(hdr.len())?,
                irradiance_size,
                irradiance_bytes: u32::try_from(irradiance.len())?,
                specular_size,
                specular_bytes: u32::try_from(specular.len())?,
                ..EnvironmentInfo::default()
            };
            let file = pack_environment(&info, &hdr, &irradiance, &specular)?;
            write_asset(&output, &file, hdr.len() + irradiance.len() + specular.len())?;
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "assetlib=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn parse_compression(s: &str) -> Result<CompressionMode, Box<dyn std::error::Error>> {
    CompressionMode::from_name(s).ok_or_else(|| format!("Unknown compression mode '{s}'").into())
}

fn write_asset(path: &Path, file: &AssetFile, raw_len: usize) -> Result<(), Box<dyn std::error::Error>> {
    save_binary_file(path, file)?;
    info!(path = %path.display(), raw = raw_len, payload = file.payload.len(), "saved asset");
    println!(
        "Created: {}  ({} B raw → {} B payload)",
        path.display(),
        raw_len,
        file.payload.len()
    );
    Ok(())
}

/// Decode every segment of `file` into freshly allocated buffers.  Declared
/// sizes are checked against the payload before anything is allocated.
fn decode(file: &AssetFile) -> Result<Vec<(&'static str, Vec<u8>)>, Box<dyn std::error::Error>> {
    Ok(match file.asset_type()? {
        AssetType::Texture => {
            let info = read_texture_info(file)?;
            info.check_plausible(file)?;
            let mut pixels = vec![0u8; usize::try_from(info.byte_size)?];
            unpack_texture(&info, file, &mut pixels)?;
            vec![("pixels.bin", pixels)]
        }
        AssetType::Mesh => {
            let info = read_mesh_info(file)?;
            info.check_plausible(file)?;
            let mut vertices = vec![0u8; info.vertex_bytes()];
            let mut indices = vec![0u8; info.index_bytes()];
            unpack_mesh(&info, file, &mut vertices, &mut indices)?;
            vec![("vertices.bin", vertices), ("indices.bin", indices)]
        }
        AssetType::Environment => {
            let info = read_environment_info(file)?;
            info.check_plausible(file)?;
            let mut hdr = vec![0u8; info.hdr_bytes as usize];
            let mut irradiance = vec![0u8; info.irradiance_bytes as usize];
            let mut specular = vec![0u8; info.specular_bytes as usize];
            unpack_environment(&info, file, &mut hdr, &mut irradiance, &mut specular)?;
            vec![("hdr.bin", hdr), ("irradiance.bin", irradiance), ("specular.bin", specular)]
        }
    })
}
