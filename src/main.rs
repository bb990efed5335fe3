#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use tunnel_router::config::Config;

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    simple_logger::init_with_level(config.log.level.as_level())?;
    tunnel_router::server_main(config)
}
