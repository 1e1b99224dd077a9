use anyhow::Result;
use env_logger::{Builder, Env};
use meshview::{MeshViewer, ViewerConfig};

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("meshview=info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let config = ViewerConfig::default().with_obj_files(std::env::args_os().skip(1));
    MeshViewer::new(config)?.run()
}
