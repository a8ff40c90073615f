//! The frontend's own option set, merged and written alongside the
//! emulator-reported options.

use crate::options::{CoreOption, OptionList};

pub const KEY_SCALING: &str = "minarch_screen_scaling";
pub const KEY_EFFECT: &str = "minarch_screen_effect";
pub const KEY_SHARPNESS: &str = "minarch_screen_sharpness";
pub const KEY_TEARING: &str = "minarch_prevent_tearing";
pub const KEY_OVERCLOCK: &str = "minarch_cpu_speed";
pub const KEY_THREAD: &str = "minarch_thread_video";
pub const KEY_DEBUG: &str = "minarch_debug_hud";
pub const KEY_MAX_FF: &str = "minarch_max_ff_speed";

fn option(
    key: &str,
    name: &str,
    desc: &str,
    labels: &[&str],
    default_index: usize,
) -> CoreOption {
    let values: Vec<String> = labels.iter().map(|&label| label.to_string()).collect();
    CoreOption {
        key: key.to_string(),
        name: name.to_string(),
        desc: desc.to_string(),
        full: desc.to_string(),
        labels: values.clone(),
        values,
        default_index,
        current_index: default_index,
        locked: false,
    }
}

/// Build the frontend option list. The Cropped scaling choice only appears
/// on devices whose platform supports overscan cropping.
#[must_use]
pub fn frontend_option_list(supports_cropped: bool) -> OptionList {
    let scaling: &[&str] = if supports_cropped {
        &["Native", "Aspect", "Fullscreen", "Cropped"]
    } else {
        &["Native", "Aspect", "Fullscreen"]
    };

    let options = vec![
        option(
            KEY_SCALING,
            "Screen Scaling",
            "Native uses integer scaling.\nAspect uses the core reported aspect ratio.\nFullscreen has non-uniform pixels.",
            scaling,
            1,
        ),
        option(
            KEY_EFFECT,
            "Screen Effect",
            "Grid simulates an LCD grid.\nLine simulates CRT scanlines.\nEffects usually look best at native scaling.",
            &["None", "Line", "Grid"],
            0,
        ),
        option(
            KEY_SHARPNESS,
            "Screen Sharpness",
            "Sharp uses nearest neighbor sampling.\nCrisp integer upscales before linear sampling.\nSoft uses linear sampling.",
            &["Sharp", "Crisp", "Soft"],
            2,
        ),
        option(
            KEY_TEARING,
            "Prevent Tearing",
            "Wait for vsync before drawing the next frame.\nLenient only waits when within frame budget.\nStrict always waits.",
            &["Off", "Lenient", "Strict"],
            1,
        ),
        option(
            KEY_OVERCLOCK,
            "CPU Speed",
            "Over- or underclock the CPU to prioritize\npure performance or power savings.",
            &["Powersave", "Normal", "Performance"],
            1,
        ),
        option(
            KEY_THREAD,
            "Thread Core",
            "Move emulation to a thread.\nPrevents audio crackle but may\ncause dropped frames.",
            &["Off", "On"],
            0,
        ),
        option(
            KEY_DEBUG,
            "Debug HUD",
            "Show frames per second, cpu load,\nresolution, and scaler information.",
            &["Off", "On"],
            0,
        ),
        option(
            KEY_MAX_FF,
            "Max FF Speed",
            "Fast forward will not exceed the\nselected speed (but may be less\ndepending on game and emulator).",
            &["None", "2x", "3x", "4x", "5x", "6x", "7x", "8x"],
            3,
        ),
    ];

    OptionList { options, changed: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cropped_choice_tracks_device_support() {
        let with = frontend_option_list(true);
        let without = frontend_option_list(false);
        assert_eq!(with.get(KEY_SCALING).unwrap().values.len(), 4);
        assert_eq!(without.get(KEY_SCALING).unwrap().values.len(), 3);
    }

    #[test]
    fn defaults_match_the_shipped_configuration() {
        let list = frontend_option_list(true);
        assert_eq!(list.value(KEY_SCALING), Some("Aspect"));
        assert_eq!(list.value(KEY_SHARPNESS), Some("Soft"));
        assert_eq!(list.value(KEY_MAX_FF), Some("4x"));
        assert_eq!(list.value(KEY_THREAD), Some("Off"));
    }
}
