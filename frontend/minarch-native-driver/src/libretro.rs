//! Loading and driving a libretro-style emulator module.
//!
//! The module's callback registrations are C function pointers with no user
//! data, so the bridge state lives in a process-wide slot ([`CoreRuntime`])
//! that the extern "C" trampolines read. Exactly one core is loaded at a
//! time.

pub mod ffi;

use crate::error::DriverError;
use crate::platform::AudioFrame;
use minarch_config::options::{OptionDefinition, OptionList, RawVariable};
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_uint, c_void};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// The back-buffer slot shared between the video-refresh trampoline and the
/// frame loop. `run_core` rides in the same mutex because the menu toggles
/// it against a worker that may be mid-callback.
#[derive(Debug, Default)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub fresh: bool,
    pub run_core: bool,
}

/// State reachable from the C callback trampolines.
pub struct CoreRuntime {
    pub core_options: Mutex<OptionList>,
    /// Raised when the core (re)registers its option list; the driver
    /// re-applies config layers and clears it.
    pub options_registered: AtomicBool,
    variable_cache: Mutex<HashMap<String, CString>>,
    pub buttons: AtomicU32,
    pub video: Mutex<VideoFrame>,
    pub video_cond: Condvar,
    pub audio: Mutex<Vec<AudioFrame>>,
    pub rumble: AtomicU16,
    system_dir: CString,
    save_dir: CString,
    /// Accept XRGB8888 sources by converting them to RGB565 on push.
    pub allow_downsample: bool,
    pub downsample: AtomicBool,
    /// (retro joypad id, core-reported label) pairs from the input
    /// descriptors; empty until the core registers them.
    pub input_labels: Mutex<Vec<(u32, String)>>,
    pub has_custom_controllers: AtomicBool,
    pub disk_control: Mutex<Option<ffi::retro_disk_control_ext_callback>>,
}

impl CoreRuntime {
    #[must_use]
    pub fn new(system_dir: &Path, save_dir: &Path, allow_downsample: bool) -> Arc<Self> {
        let to_cstring = |path: &Path| {
            CString::new(path.to_string_lossy().as_bytes()).unwrap_or_default()
        };

        Arc::new(Self {
            core_options: Mutex::new(OptionList::default()),
            options_registered: AtomicBool::new(false),
            variable_cache: Mutex::new(HashMap::new()),
            buttons: AtomicU32::new(0),
            video: Mutex::new(VideoFrame { run_core: true, ..VideoFrame::default() }),
            video_cond: Condvar::new(),
            audio: Mutex::new(Vec::new()),
            rumble: AtomicU16::new(0),
            system_dir: to_cstring(system_dir),
            save_dir: to_cstring(save_dir),
            allow_downsample,
            downsample: AtomicBool::new(false),
            input_labels: Mutex::new(Vec::new()),
            has_custom_controllers: AtomicBool::new(false),
            disk_control: Mutex::new(None),
        })
    }

    /// Pause or resume core execution (threaded mode), under the video lock.
    pub fn set_run_core(&self, run: bool) {
        self.video.lock().unwrap().run_core = run;
    }

    /// Drain queued audio frames.
    pub fn take_audio(&self, into: &mut Vec<AudioFrame>) {
        into.clear();
        into.append(&mut self.audio.lock().unwrap());
    }
}

static RUNTIME: Mutex<Option<Arc<CoreRuntime>>> = Mutex::new(None);

fn runtime() -> Option<Arc<CoreRuntime>> {
    RUNTIME.lock().unwrap().clone()
}

fn install_runtime(runtime: &Arc<CoreRuntime>) {
    *RUNTIME.lock().unwrap() = Some(Arc::clone(runtime));
}

unsafe fn cstr_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() { String::new() } else { CStr::from_ptr(ptr).to_string_lossy().into_owned() }
}

unsafe extern "C" fn video_refresh_cb(
    data: *const c_void,
    width: c_uint,
    height: c_uint,
    pitch: usize,
) {
    if data.is_null() {
        return;
    }
    let Some(runtime) = runtime() else {
        return;
    };

    let downsample = runtime.downsample.load(Ordering::Relaxed);
    let mut frame = runtime.video.lock().unwrap();

    if downsample {
        // XRGB8888 in, RGB565 out; the rest of the pipeline only sees 565
        let out_pitch = width as usize * 2;
        frame.data.resize(out_pitch * height as usize, 0);
        for y in 0..height as usize {
            let row = data.cast::<u8>().add(y * pitch);
            for x in 0..width as usize {
                let px = u32::from_ne_bytes(std::slice::from_raw_parts(row.add(x * 4), 4).try_into().unwrap());
                let rgb565 = (((px & 0xF80000) >> 8) | ((px & 0xFC00) >> 5) | ((px & 0xF8) >> 3)) as u16;
                let off = y * out_pitch + x * 2;
                frame.data[off..off + 2].copy_from_slice(&rgb565.to_ne_bytes());
            }
        }
        frame.pitch = out_pitch as u32;
    } else {
        let len = pitch * height as usize;
        frame.data.resize(len, 0);
        frame.data.copy_from_slice(std::slice::from_raw_parts(data.cast::<u8>(), len));
        frame.pitch = pitch as u32;
    }

    frame.width = width;
    frame.height = height;
    frame.fresh = true;
    drop(frame);
    runtime.video_cond.notify_one();
}

unsafe extern "C" fn audio_sample_cb(left: i16, right: i16) {
    if let Some(runtime) = runtime() {
        runtime.audio.lock().unwrap().push(AudioFrame { left, right });
    }
}

unsafe extern "C" fn audio_sample_batch_cb(data: *const i16, frames: usize) -> usize {
    if data.is_null() {
        return 0;
    }
    if let Some(runtime) = runtime() {
        let samples = std::slice::from_raw_parts(data, frames * 2);
        let mut audio = runtime.audio.lock().unwrap();
        audio.extend(
            samples.chunks_exact(2).map(|pair| AudioFrame { left: pair[0], right: pair[1] }),
        );
    }
    frames
}

unsafe extern "C" fn input_poll_cb() {
    // Input is captured into the button bitmask before the core runs
}

unsafe extern "C" fn input_state_cb(port: c_uint, device: c_uint, _index: c_uint, id: c_uint) -> i16 {
    if port != 0 || device != ffi::DEVICE_JOYPAD {
        return 0;
    }
    let Some(runtime) = runtime() else {
        return 0;
    };

    let buttons = runtime.buttons.load(Ordering::Relaxed) & 0xFFFF;
    if id == ffi::DEVICE_ID_JOYPAD_MASK {
        buttons as i16
    } else if id < 16 {
        i16::from(buttons & (1 << id) != 0)
    } else {
        0
    }
}

unsafe extern "C" fn rumble_cb(port: c_uint, _effect: c_uint, strength: u16) -> bool {
    if port != 0 {
        return false;
    }
    if let Some(runtime) = runtime() {
        runtime.rumble.store(strength, Ordering::Relaxed);
    }
    true
}

// The log interface is printf-style; varargs cannot be consumed from here,
// so only the format string is forwarded
unsafe extern "C" fn log_cb(level: c_uint, fmt: *const c_char) {
    let message = cstr_to_string(fmt);
    let message = message.trim_end();
    match level {
        ffi::LOG_DEBUG => log::debug!("core: {message}"),
        ffi::LOG_WARN => log::warn!("core: {message}"),
        ffi::LOG_ERROR => log::error!("core: {message}"),
        _ => log::info!("core: {message}"),
    }
}

unsafe fn read_variables(mut ptr: *const ffi::retro_variable) -> Vec<RawVariable> {
    let mut variables = Vec::new();
    while !ptr.is_null() && !(*ptr).key.is_null() {
        variables.push(RawVariable {
            key: cstr_to_string((*ptr).key),
            value: cstr_to_string((*ptr).value),
        });
        ptr = ptr.add(1);
    }
    variables
}

unsafe fn read_option_definitions(
    mut ptr: *const ffi::retro_core_option_definition,
) -> Vec<OptionDefinition> {
    let mut definitions = Vec::new();
    while !ptr.is_null() && !(*ptr).key.is_null() {
        let def = &*ptr;
        let mut values = Vec::new();
        for value in &def.values {
            if value.value.is_null() {
                break;
            }
            let label = if value.label.is_null() {
                None
            } else {
                Some(cstr_to_string(value.label))
            };
            values.push((cstr_to_string(value.value), label));
        }

        definitions.push(OptionDefinition {
            key: cstr_to_string(def.key),
            desc: cstr_to_string(def.desc),
            info: cstr_to_string(def.info),
            values,
            default_value: if def.default_value.is_null() {
                None
            } else {
                Some(cstr_to_string(def.default_value))
            },
        });
        ptr = ptr.add(1);
    }
    definitions
}

unsafe extern "C" fn environment_cb(cmd: c_uint, data: *mut c_void) -> bool {
    let Some(runtime) = runtime() else {
        return false;
    };

    match cmd {
        ffi::ENV_GET_OVERSCAN | ffi::ENV_GET_CAN_DUPE => {
            if !data.is_null() {
                *data.cast::<bool>() = true;
            }
            true
        }
        ffi::ENV_SET_MESSAGE => {
            if !data.is_null() {
                let message = &*data.cast::<ffi::retro_message>();
                log::info!("core message: {}", cstr_to_string(message.msg));
            }
            true
        }
        ffi::ENV_GET_SYSTEM_DIRECTORY => {
            if !data.is_null() {
                *data.cast::<*const c_char>() = runtime.system_dir.as_ptr();
            }
            true
        }
        ffi::ENV_GET_SAVE_DIRECTORY => {
            if !data.is_null() {
                *data.cast::<*const c_char>() = runtime.save_dir.as_ptr();
            }
            true
        }
        ffi::ENV_SET_PIXEL_FORMAT => {
            if data.is_null() {
                return false;
            }
            match *data.cast::<c_uint>() {
                ffi::PIXEL_FORMAT_RGB565 => {
                    runtime.downsample.store(false, Ordering::Relaxed);
                    true
                }
                ffi::PIXEL_FORMAT_XRGB8888 if runtime.allow_downsample => {
                    log::info!("Core uses XRGB8888, downsampling to RGB565");
                    runtime.downsample.store(true, Ordering::Relaxed);
                    true
                }
                other => {
                    log::error!("Rejecting unsupported pixel format {other}");
                    false
                }
            }
        }
        ffi::ENV_SET_INPUT_DESCRIPTORS => {
            let mut labels = Vec::new();
            let mut ptr = data.cast::<ffi::retro_input_descriptor>().cast_const();
            while !ptr.is_null() && !(*ptr).description.is_null() {
                let desc = &*ptr;
                if desc.port == 0 && desc.device == ffi::DEVICE_JOYPAD && desc.id < 16 {
                    labels.push((desc.id, cstr_to_string(desc.description)));
                }
                ptr = ptr.add(1);
            }
            *runtime.input_labels.lock().unwrap() = labels;
            true
        }
        ffi::ENV_SET_DISK_CONTROL_INTERFACE => {
            if !data.is_null() {
                let base = *data.cast::<ffi::retro_disk_control_callback>();
                *runtime.disk_control.lock().unwrap() = Some(ffi::retro_disk_control_ext_callback {
                    base,
                    set_initial_image: None,
                    get_image_path: None,
                    get_image_label: None,
                });
            }
            true
        }
        ffi::ENV_SET_DISK_CONTROL_EXT_INTERFACE => {
            if !data.is_null() {
                *runtime.disk_control.lock().unwrap() =
                    Some(*data.cast::<ffi::retro_disk_control_ext_callback>());
            }
            true
        }
        ffi::ENV_GET_VARIABLE => {
            if data.is_null() {
                return false;
            }
            let variable = &mut *data.cast::<ffi::retro_variable>();
            let key = cstr_to_string(variable.key);
            let options = runtime.core_options.lock().unwrap();
            match options.value(&key) {
                Some(value) => {
                    let cached = CString::new(value).unwrap_or_default();
                    let mut cache = runtime.variable_cache.lock().unwrap();
                    let entry = cache.entry(key).or_default();
                    *entry = cached;
                    variable.value = entry.as_ptr();
                    true
                }
                None => {
                    variable.value = std::ptr::null();
                    false
                }
            }
        }
        ffi::ENV_SET_VARIABLES => {
            let variables = read_variables(data.cast::<ffi::retro_variable>().cast_const());
            log::info!("Core registered {} variables", variables.len());
            *runtime.core_options.lock().unwrap() = OptionList::from_variables(&variables);
            runtime.options_registered.store(true, Ordering::Release);
            true
        }
        ffi::ENV_GET_VARIABLE_UPDATE => {
            if !data.is_null() {
                *data.cast::<bool>() = runtime.core_options.lock().unwrap().take_changed();
            }
            true
        }
        ffi::ENV_SET_VARIABLE => {
            if data.is_null() {
                // Null query means "is this call supported"
                return true;
            }
            let variable = &*data.cast::<ffi::retro_variable>();
            let key = cstr_to_string(variable.key);
            let value = cstr_to_string(variable.value);
            runtime.core_options.lock().unwrap().set_value(&key, &value);
            true
        }
        ffi::ENV_SET_CORE_OPTIONS => {
            let definitions =
                read_option_definitions(data.cast::<ffi::retro_core_option_definition>().cast_const());
            log::info!("Core registered {} options", definitions.len());
            *runtime.core_options.lock().unwrap() = OptionList::from_definitions(&definitions);
            runtime.options_registered.store(true, Ordering::Release);
            true
        }
        ffi::ENV_SET_CORE_OPTIONS_INTL => {
            if data.is_null() {
                return false;
            }
            let intl = &*data.cast::<ffi::retro_core_options_intl>();
            let definitions = read_option_definitions(intl.us);
            log::info!("Core registered {} options (intl)", definitions.len());
            *runtime.core_options.lock().unwrap() = OptionList::from_definitions(&definitions);
            runtime.options_registered.store(true, Ordering::Release);
            true
        }
        ffi::ENV_GET_CORE_OPTIONS_VERSION => {
            if !data.is_null() {
                *data.cast::<c_uint>() = 1;
            }
            true
        }
        ffi::ENV_GET_INPUT_BITMASKS => true,
        ffi::ENV_GET_RUMBLE_INTERFACE => {
            if !data.is_null() {
                (*data.cast::<ffi::retro_rumble_interface>()).set_rumble_state = rumble_cb;
            }
            true
        }
        ffi::ENV_GET_LOG_INTERFACE => {
            if !data.is_null() {
                (*data.cast::<ffi::retro_log_callback>()).log = log_cb;
            }
            true
        }
        ffi::ENV_SET_CONTROLLER_INFO => {
            let mut ptr = data.cast::<ffi::retro_controller_info>().cast_const();
            while !ptr.is_null() && !(*ptr).types.is_null() {
                let info = &*ptr;
                for i in 0..info.num_types as usize {
                    let desc = &*info.types.add(i);
                    let name = cstr_to_string(desc.desc).to_ascii_lowercase();
                    if name.contains("dualshock") {
                        runtime.has_custom_controllers.store(true, Ordering::Relaxed);
                    }
                }
                ptr = ptr.add(1);
            }
            true
        }
        ffi::ENV_SET_PERFORMANCE_LEVEL => {
            if !data.is_null() {
                log::debug!("Core performance level: {}", *data.cast::<c_uint>());
            }
            false
        }
        _ => {
            log::debug!("Unsupported environment call {}", cmd & !ffi::ENVIRONMENT_EXPERIMENTAL);
            false
        }
    }
}

pub type RetroRunFn = unsafe extern "C" fn();

struct CoreApi {
    init: unsafe extern "C" fn(),
    deinit: unsafe extern "C" fn(),
    api_version: unsafe extern "C" fn() -> c_uint,
    get_system_info: unsafe extern "C" fn(*mut ffi::retro_system_info),
    get_system_av_info: unsafe extern "C" fn(*mut ffi::retro_system_av_info),
    set_controller_port_device: unsafe extern "C" fn(c_uint, c_uint),
    reset: unsafe extern "C" fn(),
    run: RetroRunFn,
    serialize_size: unsafe extern "C" fn() -> usize,
    serialize: unsafe extern "C" fn(*mut c_void, usize) -> bool,
    unserialize: unsafe extern "C" fn(*const c_void, usize) -> bool,
    load_game: unsafe extern "C" fn(*const ffi::retro_game_info) -> bool,
    unload_game: unsafe extern "C" fn(),
    get_memory_data: unsafe extern "C" fn(c_uint) -> *mut c_void,
    get_memory_size: unsafe extern "C" fn(c_uint) -> usize,
}

/// A loaded emulator module.
pub struct Core {
    // Field order keeps the library alive for as long as its fn pointers
    api: CoreApi,
    _lib: Option<libloading::Library>,
    pub runtime: Arc<CoreRuntime>,
    pub name: String,
    pub version: String,
    pub tag: String,
    pub extensions: Vec<String>,
    pub need_fullpath: bool,
    pub fps: f64,
    pub sample_rate: f64,
    pub aspect_ratio: f64,
}

macro_rules! resolve {
    ($lib:expr, $path:expr, $name:literal, $ty:ty) => {{
        let symbol: libloading::Symbol<'_, $ty> = $lib.get($name.as_bytes()).map_err(|source| {
            DriverError::MissingSymbol { name: $name, path: $path.display().to_string(), source }
        })?;
        *symbol
    }};
}

impl Core {
    /// Load the module, resolve the full symbol set (any missing symbol is
    /// fatal), and register the callback trampolines.
    pub fn open(path: &Path, runtime: Arc<CoreRuntime>) -> Result<Self, DriverError> {
        log::info!("Loading core '{}'", path.display());

        // SAFETY: the module is trusted platform content; symbol signatures
        // follow the libretro ABI
        unsafe {
            let lib = libloading::Library::new(path).map_err(|source| DriverError::CoreLoad {
                path: path.display().to_string(),
                source,
            })?;

            let api = CoreApi {
                init: resolve!(lib, path, "retro_init", unsafe extern "C" fn()),
                deinit: resolve!(lib, path, "retro_deinit", unsafe extern "C" fn()),
                api_version: resolve!(lib, path, "retro_api_version", unsafe extern "C" fn() -> c_uint),
                get_system_info: resolve!(lib, path, "retro_get_system_info", unsafe extern "C" fn(*mut ffi::retro_system_info)),
                get_system_av_info: resolve!(lib, path, "retro_get_system_av_info", unsafe extern "C" fn(*mut ffi::retro_system_av_info)),
                set_controller_port_device: resolve!(lib, path, "retro_set_controller_port_device", unsafe extern "C" fn(c_uint, c_uint)),
                reset: resolve!(lib, path, "retro_reset", unsafe extern "C" fn()),
                run: resolve!(lib, path, "retro_run", unsafe extern "C" fn()),
                serialize_size: resolve!(lib, path, "retro_serialize_size", unsafe extern "C" fn() -> usize),
                serialize: resolve!(lib, path, "retro_serialize", unsafe extern "C" fn(*mut c_void, usize) -> bool),
                unserialize: resolve!(lib, path, "retro_unserialize", unsafe extern "C" fn(*const c_void, usize) -> bool),
                load_game: resolve!(lib, path, "retro_load_game", unsafe extern "C" fn(*const ffi::retro_game_info) -> bool),
                unload_game: resolve!(lib, path, "retro_unload_game", unsafe extern "C" fn()),
                get_memory_data: resolve!(lib, path, "retro_get_memory_data", unsafe extern "C" fn(c_uint) -> *mut c_void),
                get_memory_size: resolve!(lib, path, "retro_get_memory_size", unsafe extern "C" fn(c_uint) -> usize),
            };

            let set_environment = resolve!(lib, path, "retro_set_environment", unsafe extern "C" fn(ffi::retro_environment_t));
            let set_video_refresh = resolve!(lib, path, "retro_set_video_refresh", unsafe extern "C" fn(ffi::retro_video_refresh_t));
            let set_audio_sample = resolve!(lib, path, "retro_set_audio_sample", unsafe extern "C" fn(ffi::retro_audio_sample_t));
            let set_audio_sample_batch = resolve!(lib, path, "retro_set_audio_sample_batch", unsafe extern "C" fn(ffi::retro_audio_sample_batch_t));
            let set_input_poll = resolve!(lib, path, "retro_set_input_poll", unsafe extern "C" fn(ffi::retro_input_poll_t));
            let set_input_state = resolve!(lib, path, "retro_set_input_state", unsafe extern "C" fn(ffi::retro_input_state_t));

            install_runtime(&runtime);

            let api_version = (api.api_version)();
            if api_version != ffi::RETRO_API_VERSION {
                log::warn!(
                    "Core reports API version {api_version}, expected {}",
                    ffi::RETRO_API_VERSION
                );
            }

            set_environment(environment_cb);
            set_video_refresh(video_refresh_cb);
            set_audio_sample(audio_sample_cb);
            set_audio_sample_batch(audio_sample_batch_cb);
            set_input_poll(input_poll_cb);
            set_input_state(input_state_cb);

            let mut info = ffi::retro_system_info::default();
            (api.get_system_info)(&mut info);

            let name = cstr_to_string(info.library_name);
            let version = cstr_to_string(info.library_version);
            let extensions: Vec<String> = cstr_to_string(info.valid_extensions)
                .split('|')
                .filter(|ext| !ext.is_empty())
                .map(str::to_string)
                .collect();

            let tag = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
                .trim_end_matches("_libretro")
                .to_string();

            log::info!("Core: {name} {version} (extensions: {extensions:?})");

            Ok(Self {
                api,
                _lib: Some(lib),
                runtime,
                name,
                version,
                tag,
                extensions,
                need_fullpath: info.need_fullpath,
                fps: 0.0,
                sample_rate: 0.0,
                aspect_ratio: 0.0,
            })
        }
    }

    pub fn init(&mut self) {
        unsafe { (self.api.init)() }
    }

    pub fn deinit(&mut self) {
        unsafe { (self.api.deinit)() }
    }

    /// Load the game and read back the AV info.
    pub fn load_game(&mut self, path: &Path, data: Option<&[u8]>) -> Result<(), DriverError> {
        let c_path = CString::new(path.to_string_lossy().as_bytes()).unwrap_or_default();
        let info = ffi::retro_game_info {
            path: c_path.as_ptr(),
            data: data.map_or(std::ptr::null(), |d| d.as_ptr().cast()),
            size: data.map_or(0, <[u8]>::len),
            meta: std::ptr::null(),
        };

        let ok = unsafe { (self.api.load_game)(&info) };
        if !ok {
            return Err(DriverError::LoadGame { path: path.display().to_string() });
        }

        let mut av = ffi::retro_system_av_info::default();
        unsafe { (self.api.get_system_av_info)(&mut av) };

        self.fps = av.timing.fps;
        self.sample_rate = av.timing.sample_rate;
        self.aspect_ratio = f64::from(av.geometry.aspect_ratio);
        if self.aspect_ratio <= 0.0 {
            self.aspect_ratio =
                f64::from(av.geometry.base_width) / f64::from(av.geometry.base_height);
        }
        log::info!(
            "AV info: {}x{} aspect {:.3} fps {:.3}",
            av.geometry.base_width,
            av.geometry.base_height,
            self.aspect_ratio,
            self.fps
        );

        unsafe { (self.api.set_controller_port_device)(0, ffi::DEVICE_JOYPAD) };
        Ok(())
    }

    pub fn unload_game(&mut self) {
        unsafe { (self.api.unload_game)() }
    }

    pub fn reset(&mut self) {
        unsafe { (self.api.reset)() }
    }

    pub fn run(&mut self) {
        unsafe { (self.api.run)() }
    }

    /// The raw run entry point for the worker thread. Only one thread may
    /// call it at a time; the frame loop guarantees that by joining the
    /// worker before running inline.
    #[must_use]
    pub fn run_fn(&self) -> RetroRunFn {
        self.api.run
    }

    #[must_use]
    pub fn serialize_size(&mut self) -> usize {
        unsafe { (self.api.serialize_size)() }
    }

    #[must_use]
    pub fn serialize(&mut self, buffer: &mut [u8]) -> bool {
        unsafe { (self.api.serialize)(buffer.as_mut_ptr().cast(), buffer.len()) }
    }

    #[must_use]
    pub fn unserialize(&mut self, buffer: &[u8]) -> bool {
        unsafe { (self.api.unserialize)(buffer.as_ptr().cast(), buffer.len()) }
    }

    /// Copy out a memory region (SRAM, RTC). None when the core exposes no
    /// such region.
    #[must_use]
    pub fn read_memory(&mut self, memory: c_uint) -> Option<Vec<u8>> {
        unsafe {
            let size = (self.api.get_memory_size)(memory);
            let data = (self.api.get_memory_data)(memory);
            if size == 0 || data.is_null() {
                return None;
            }
            Some(std::slice::from_raw_parts(data.cast::<u8>(), size).to_vec())
        }
    }

    /// Copy bytes into a memory region, truncating to the region size.
    pub fn write_memory(&mut self, memory: c_uint, bytes: &[u8]) {
        unsafe {
            let size = (self.api.get_memory_size)(memory);
            let data = (self.api.get_memory_data)(memory);
            if size == 0 || data.is_null() {
                return;
            }
            let len = size.min(bytes.len());
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data.cast::<u8>(), len);
        }
    }

    /// Build a core around in-process stub entry points for loop and menu
    /// tests; no module is loaded.
    #[cfg(test)]
    pub(crate) fn stub(runtime: Arc<CoreRuntime>) -> Self {
        install_runtime(&runtime);
        Self {
            api: stub_core::api(),
            _lib: None,
            runtime,
            name: "Stub".into(),
            version: "1.0".into(),
            tag: "stub".into(),
            extensions: vec!["gba".into(), "bin".into()],
            need_fullpath: false,
            fps: 60.0,
            sample_rate: 44100.0,
            aspect_ratio: 4.0 / 3.0,
        }
    }

    /// Swap in a different disc image through the disk-control interface.
    pub fn replace_disc(&mut self, path: &Path, data: Option<&[u8]>) -> bool {
        let Some(control) = *self.runtime.disk_control.lock().unwrap() else {
            log::warn!("Core exposes no disk control interface");
            return false;
        };

        let c_path = CString::new(path.to_string_lossy().as_bytes()).unwrap_or_default();
        let info = ffi::retro_game_info {
            path: c_path.as_ptr(),
            data: data.map_or(std::ptr::null(), |d| d.as_ptr().cast()),
            size: data.map_or(0, <[u8]>::len),
            meta: std::ptr::null(),
        };

        unsafe { (control.base.replace_image_index)(0, &info) }
    }
}

#[cfg(test)]
pub(crate) mod stub_core {
    //! In-process libretro entry points for tests. `retro_run` pushes one
    //! checkerboard frame and a short audio batch through the real
    //! trampolines.

    use super::*;

    pub(crate) const FRAME_W: u32 = 64;
    pub(crate) const FRAME_H: u32 = 48;

    static FRAME: [u16; (FRAME_W * FRAME_H) as usize] = {
        let mut frame = [0_u16; (FRAME_W * FRAME_H) as usize];
        let mut i = 0;
        while i < frame.len() {
            let x = i as u32 % FRAME_W;
            let y = i as u32 / FRAME_W;
            if (x + y) % 2 == 1 {
                frame[i] = 0xFFFF;
            }
            i += 1;
        }
        frame
    };

    unsafe extern "C" fn stub_noop() {}

    unsafe extern "C" fn stub_api_version() -> c_uint {
        ffi::RETRO_API_VERSION
    }

    unsafe extern "C" fn stub_get_system_info(info: *mut ffi::retro_system_info) {
        *info = ffi::retro_system_info::default();
    }

    unsafe extern "C" fn stub_get_system_av_info(info: *mut ffi::retro_system_av_info) {
        (*info).geometry.base_width = FRAME_W;
        (*info).geometry.base_height = FRAME_H;
        (*info).timing.fps = 60.0;
        (*info).timing.sample_rate = 44100.0;
    }

    unsafe extern "C" fn stub_set_controller_port_device(_port: c_uint, _device: c_uint) {}

    unsafe extern "C" fn stub_run() {
        video_refresh_cb(
            FRAME.as_ptr().cast(),
            FRAME_W,
            FRAME_H,
            FRAME_W as usize * 2,
        );
        let samples = [0_i16; 8];
        audio_sample_batch_cb(samples.as_ptr(), 4);
    }

    unsafe extern "C" fn stub_serialize_size() -> usize {
        64
    }

    unsafe extern "C" fn stub_serialize(data: *mut c_void, size: usize) -> bool {
        std::slice::from_raw_parts_mut(data.cast::<u8>(), size).fill(0x5A);
        true
    }

    unsafe extern "C" fn stub_unserialize(data: *const c_void, size: usize) -> bool {
        !data.is_null() && size > 0
    }

    unsafe extern "C" fn stub_load_game(_info: *const ffi::retro_game_info) -> bool {
        true
    }

    unsafe extern "C" fn stub_get_memory_data(_memory: c_uint) -> *mut c_void {
        std::ptr::null_mut()
    }

    unsafe extern "C" fn stub_get_memory_size(_memory: c_uint) -> usize {
        0
    }

    pub(crate) fn api() -> CoreApi {
        CoreApi {
            init: stub_noop,
            deinit: stub_noop,
            api_version: stub_api_version,
            get_system_info: stub_get_system_info,
            get_system_av_info: stub_get_system_av_info,
            set_controller_port_device: stub_set_controller_port_device,
            reset: stub_noop,
            run: stub_run,
            serialize_size: stub_serialize_size,
            serialize: stub_serialize,
            unserialize: stub_unserialize,
            load_game: stub_load_game,
            unload_game: stub_noop,
            get_memory_data: stub_get_memory_data,
            get_memory_size: stub_get_memory_size,
        }
    }
}
