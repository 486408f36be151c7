//! Opens an 800x600 window, reports the GPU it found and clears every frame
//! until the window is closed.

use gpu_primer::viewer::run_tutorial;
use gpu_primer::{Frame, Options, PrimerError, RenderContext, Scene};

struct HelloWindow;

impl Scene for HelloWindow {
    fn init(ctx: &RenderContext, _options: &Options) -> Result<Self, PrimerError> {
        let adapters = RenderContext::enumerate_adapters();
        log::info!("{} adapters available:", adapters.len());
        for info in &adapters {
            log::info!(
                "\t{} ({:?}, {:?}, driver {})",
                info.name,
                info.backend,
                info.device_type,
                info.driver
            );
        }
        if let Some(info) = ctx.adapter_info() {
            log::info!("selected adapter: {}", info.name);
        }
        log::info!("device features: {:?}", ctx.device.features());
        log::debug!("device limits: {:#?}", ctx.device.limits());
        Ok(Self)
    }

    fn render(&mut self, _frame: &mut Frame<'_>, _elapsed: f32) -> Result<(), PrimerError> {
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run_tutorial::<HelloWindow>("hello_window") {
        log::error!("{e}");
        std::process::exit(-1);
    }
}
