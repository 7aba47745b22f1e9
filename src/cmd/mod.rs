mod burn;
mod captions;
mod plan;
mod run;

pub use burn::cmd_burn;
pub use captions::cmd_captions;
pub use plan::cmd_plan;
pub use run::{cmd_run, RunOverrides};

use capburn::annotate::CompositorConfig;

/// Switch the encoder to the platform's hardware encoder
fn with_platform_hwaccel(config: CompositorConfig) -> CompositorConfig {
    #[cfg(target_os = "macos")]
    {
        eprintln!("   Hardware acceleration: VideoToolbox");
        config.with_hwaccel("videotoolbox")
    }
    #[cfg(not(target_os = "macos"))]
    {
        eprintln!("   Hardware acceleration: NVENC");
        config.with_hwaccel("nvenc")
    }
}
