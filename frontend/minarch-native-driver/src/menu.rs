//! The in-game menu: pause snapshot, save/load slots with previews, disc
//! switching, option screens, and control remapping.

use crate::game;
use crate::mainloop::Session;
use crate::platform::{CpuSpeed, Platform, Surface, TextStyle, VsyncMode};
use crate::state::SAVE_SLOT_COUNT;
use minarch_common::input::{Buttons, JoypadButton};
use minarch_config::frontend_options as fe;
use minarch_scaler::fractional::{average_1_1, scale_nearest16};
use std::sync::Arc;

const ROW_HEIGHT: u32 = 24;
const PADDING: u32 = 10;

/// Shortcut-triggered save to the remembered slot (no UI).
pub(crate) fn quick_save<P: Platform>(s: &mut Session<P>) {
    let slot = s.states.slot;
    save_to_slot(s, slot);
}

/// Shortcut-triggered load from the remembered slot (no UI).
pub(crate) fn quick_load<P: Platform>(s: &mut Session<P>) {
    let slot = s.states.slot;
    load_from_slot(s, slot);
}

fn save_to_slot<P: Platform>(s: &mut Session<P>, slot: usize) {
    if let Some(set) = &s.game.disc_set {
        s.states.write_disc_marker(slot, &set.base_dir, &set.discs[set.current]);
    }

    // Preview is the uncropped source frame in its native format
    let frame = {
        let runtime = Arc::clone(&s.core.runtime);
        let frame = runtime.video.lock().unwrap();
        (!frame.data.is_empty())
            .then(|| (frame.data.clone(), frame.width, frame.height, frame.pitch))
    };
    if let Some((data, width, height, pitch)) = frame {
        s.states.write_preview(slot, &data, width, height, pitch);
    }

    if let Err(err) = s.states.write(&mut s.core, slot) {
        log::error!("Save state failed: {err}");
    }
}

fn load_from_slot<P: Platform>(s: &mut Session<P>, slot: usize) {
    if !s.states.status(slot).save_exists {
        return;
    }

    // A state saved on a different disc swaps that disc in first
    if let Some(set) = s.game.disc_set.clone() {
        if let Some(marker_disc) = s.states.read_disc_marker(slot, &set.base_dir) {
            if marker_disc != set.discs[set.current] {
                if let Err(err) = s.game.change_disc(&mut s.core, &marker_disc) {
                    log::error!("Disc change for state load failed: {err}");
                }
            }
        }
    }

    if let Err(err) = s.states.read(&mut s.core, slot) {
        log::error!("Load state failed: {err}");
    }
}

/// Per-iteration menu input: polled buttons plus edge detection.
struct MenuInput {
    pressed: Buttons,
}

fn poll_menu_input<P: Platform>(s: &mut Session<P>, prev: &mut Buttons) -> MenuInput {
    s.platform.vsync_wait(16);
    let buttons = s.platform.poll_input();
    let pressed = buttons.just_pressed(*prev);
    *prev = buttons;
    MenuInput { pressed }
}

/// Scale a 16-bit frame into an aspect-fit rectangle of `dst`, centered.
fn scale_into(frame: &[u8], fw: u32, fh: u32, fp: u32, dst: &mut Surface) {
    if fw == 0 || fh == 0 {
        return;
    }

    let scale = (f64::from(dst.width) / f64::from(fw)).min(f64::from(dst.height) / f64::from(fh));
    let out_w = ((f64::from(fw) * scale) as u32).min(dst.width).max(1);
    let out_h = ((f64::from(fh) * scale) as u32).min(dst.height).max(1);
    let ox = (dst.width - out_w) / 2;
    let oy = (dst.height - out_h) / 2;

    let dst_off = (oy * dst.pitch + ox * 2) as usize;
    scale_nearest16(frame, &mut dst.pixels[dst_off..], fw, fh, fp, out_w, out_h, dst.pitch);
}

fn darken(surface: &mut Surface) {
    for px in surface.pixels.chunks_exact_mut(2) {
        let pixel = u16::from_ne_bytes([px[0], px[1]]);
        px.copy_from_slice(&average_1_1(pixel, 0x0000).to_ne_bytes());
    }
}

const ITEM_CONT: usize = 0;
const ITEM_SAVE: usize = 1;
const ITEM_LOAD: usize = 2;
const ITEM_OPTS: usize = 3;
const ITEM_QUIT: usize = 4;
const MENU_ITEM_COUNT: usize = 5;

/// Run the in-game menu until the user resumes, loads, saves, or quits.
pub(crate) fn menu_loop<P: Platform>(s: &mut Session<P>) {
    // Stop the worker's core execution while the menu owns the screen
    s.core.runtime.set_run_core(false);

    game::save_persistent_memory(&mut s.core, &s.paths, &s.game.name);
    s.platform.set_cpu_speed(CpuSpeed::Menu);
    s.platform.set_vsync(VsyncMode::Strict);
    s.platform.set_effect(minarch_renderer::ScreenEffect::None);
    s.platform.set_rumble(0);

    // Snapshot the last frame for the background and slot previews
    let snapshot = {
        let runtime = Arc::clone(&s.core.runtime);
        let frame = runtime.video.lock().unwrap();
        (!frame.data.is_empty())
            .then(|| (frame.data.clone(), frame.width, frame.height, frame.pitch))
    };

    // The menu always renders at device size; remember what to restore
    let device = s.platform.device_geometry();
    let restore = (s.surface.width, s.surface.height, s.surface.pitch);
    if restore != (device.width, device.height, device.pitch) {
        s.surface.resize(device.width, device.height, device.pitch);
        s.platform.resize(device.width, device.height, device.pitch);
    }

    let mut background = Surface::new(device.width, device.height, device.pitch);
    if let Some((data, w, h, p)) = &snapshot {
        scale_into(data, *w, *h, *p, &mut background);
    }
    darken(&mut background);

    let items: [&str; MENU_ITEM_COUNT] = [
        "Continue",
        "Save",
        "Load",
        if s.simple_mode { "Reset" } else { "Options" },
        "Quit",
    ];

    let total_discs = s.game.disc_set.as_ref().map_or(0, |set| set.total());
    let rom_disc = s.game.disc_set.as_ref().map_or(0, |set| set.current);
    let mut menu_disc = rom_disc;

    let mut selected = 0_usize;
    let mut slot = s.states.slot;
    let mut prev = Buttons::NONE;
    let mut dirty = true;
    let mut show_menu = true;

    while show_menu && !s.quit {
        let input = poll_menu_input(s, &mut prev);

        if input.pressed.pressed(JoypadButton::Up) {
            selected = (selected + MENU_ITEM_COUNT - 1) % MENU_ITEM_COUNT;
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::Down) {
            selected = (selected + 1) % MENU_ITEM_COUNT;
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::Left) {
            if total_discs > 1 && selected == ITEM_CONT {
                menu_disc = (menu_disc + total_discs - 1) % total_discs;
                dirty = true;
            } else if selected == ITEM_SAVE || selected == ITEM_LOAD {
                slot = (slot + SAVE_SLOT_COUNT - 1) % SAVE_SLOT_COUNT;
                dirty = true;
            }
        } else if input.pressed.pressed(JoypadButton::Right) {
            if total_discs > 1 && selected == ITEM_CONT {
                menu_disc = (menu_disc + 1) % total_discs;
                dirty = true;
            } else if selected == ITEM_SAVE || selected == ITEM_LOAD {
                slot = (slot + 1) % SAVE_SLOT_COUNT;
                dirty = true;
            }
        }

        if input.pressed.pressed(JoypadButton::B) || input.pressed.pressed(JoypadButton::Menu) {
            show_menu = false;
        } else if input.pressed.pressed(JoypadButton::A) {
            match selected {
                ITEM_CONT => {
                    if total_discs > 0 && menu_disc != rom_disc {
                        let disc_path = s.game.disc_set.as_ref().map(|set| set.discs[menu_disc].clone());
                        if let Some(path) = disc_path {
                            if let Err(err) = s.game.change_disc(&mut s.core, &path) {
                                log::error!("Disc change failed: {err}");
                            }
                        }
                    }
                    show_menu = false;
                }
                ITEM_SAVE => {
                    save_to_slot(s, slot);
                    show_menu = false;
                }
                ITEM_LOAD => {
                    load_from_slot(s, slot);
                    show_menu = false;
                }
                ITEM_OPTS => {
                    if s.simple_mode {
                        s.core.reset();
                        show_menu = false;
                    } else {
                        let old_scaling =
                            s.config.frontend.value(fe::KEY_SCALING).map(str::to_string);
                        options_menu(s);
                        let new_scaling =
                            s.config.frontend.value(fe::KEY_SCALING).map(str::to_string);
                        if old_scaling != new_scaling {
                            // Geometry changed under the snapshot; rebuild
                            // the background at device size
                            background.clear();
                            if let Some((data, w, h, p)) = &snapshot {
                                scale_into(data, *w, *h, *p, &mut background);
                            }
                            darken(&mut background);
                        }
                        dirty = true;
                    }
                }
                _ => {
                    show_menu = false;
                    s.quit = true;
                }
            }
        }

        if dirty {
            s.surface.pixels.copy_from_slice(&background.pixels);
            draw_top_menu(s, &items, selected, slot, total_discs, menu_disc);
            s.platform.flip(&s.surface);
            dirty = false;
        }
    }

    // Restore the pre-menu pipeline state
    s.platform.set_effect(s.screen_effect);
    s.platform.set_vsync(s.vsync);
    s.platform.set_cpu_speed(s.overclock);

    if !s.quit {
        if (s.surface.width, s.surface.height, s.surface.pitch) != restore {
            s.surface.resize(restore.0, restore.1, restore.2);
            s.platform.resize(restore.0, restore.1, restore.2);
        }
        // Re-present the paused frame through the (possibly reselected)
        // scaler on the next loop iteration
        let runtime = Arc::clone(&s.core.runtime);
        let mut frame = runtime.video.lock().unwrap();
        if !frame.data.is_empty() {
            frame.fresh = true;
        }
        frame.run_core = true;
    }
}

fn draw_top_menu<P: Platform>(
    s: &mut Session<P>,
    items: &[&str; MENU_ITEM_COUNT],
    selected: usize,
    slot: usize,
    total_discs: usize,
    menu_disc: usize,
) {
    let s = &mut *s;
    let oy = (s.surface.height - MENU_ITEM_COUNT as u32 * ROW_HEIGHT) / 2;

    for (i, item) in items.iter().enumerate() {
        let y = (oy + i as u32 * ROW_HEIGHT) as i32;
        let style = if i == selected { TextStyle::LargeInverted } else { TextStyle::Large };
        if i == selected {
            let width = s.platform.text_width(item, TextStyle::Large);
            s.surface.fill_rect(PADDING, y as u32, width + PADDING, ROW_HEIGHT, 0xFFFF);
        }
        s.platform.draw_text(&mut s.surface, item, (PADDING * 2) as i32, y, style);

        if i == ITEM_CONT && total_discs > 1 {
            let label = format!("Disc {}", menu_disc + 1);
            let x = s.surface.width - PADDING - s.platform.text_width(&label, TextStyle::Large);
            s.platform.draw_text(&mut s.surface, &label, x as i32, y, TextStyle::Large);
        }
    }

    if selected == ITEM_SAVE || selected == ITEM_LOAD {
        draw_slot_panel(s, slot);
    }
}

/// Preview thumbnail panel: the slot's BMP scaled to half device size, a
/// "No Preview" placeholder when only the state exists, or "Empty Slot".
fn draw_slot_panel<P: Platform>(s: &mut Session<P>, slot: usize) {
    let s = &mut *s;
    let hw = s.surface.width / 2;
    let hh = s.surface.height / 2;
    let ox = s.surface.width - hw - PADDING;
    let oy = (s.surface.height - hh) / 2;

    s.surface.fill_rect(ox, oy, hw, hh, 0x0000);

    let status = s.states.status(slot);
    if status.preview_exists {
        if let Some((pixels, width, height)) = s.states.read_preview(slot) {
            let frame: &[u8] = bytemuck::cast_slice(&pixels);
            let mut panel = Surface::new(hw, hh, hw * 2);
            scale_into(frame, width, height, width * 2, &mut panel);
            for y in 0..hh {
                let src_off = (y * panel.pitch) as usize;
                let dst_off = ((oy + y) * s.surface.pitch + ox * 2) as usize;
                s.surface.pixels[dst_off..dst_off + (hw * 2) as usize]
                    .copy_from_slice(&panel.pixels[src_off..src_off + (hw * 2) as usize]);
            }
        }
    } else {
        let label = if status.save_exists { "No Preview" } else { "Empty Slot" };
        let x = ox + (hw - s.platform.text_width(label, TextStyle::Large)) / 2;
        let y = oy + hh / 2;
        s.platform.draw_text(&mut s.surface, label, x as i32, y as i32, TextStyle::Large);
    }

    // Slot pagination dots under the panel
    for i in 0..SAVE_SLOT_COUNT {
        let x = ox + (i as u32) * 12;
        let y = oy + hh + 6;
        let color = if i == slot { 0xFFFF } else { 0x528A };
        s.surface.fill_rect(x, y, 8, 4, color);
    }
}

/// Which kind of rows an option screen shows and how input maps onto them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreenKind {
    /// Vertical action buttons.
    List,
    /// Label + value rows, left/right cycles.
    Var,
    /// Like Var, but A opens an info pop-up.
    Fixed,
    /// One row per binding, A waits for input, X unbinds.
    Input,
}

struct Row {
    label: String,
    value: Option<String>,
}

/// Generic paged screen loop: returns the confirmed row for List screens,
/// None when dismissed. Mutation callbacks run against the session between
/// iterations.
fn screen_loop<P: Platform, FRows, FSide, FConfirm>(
    s: &mut Session<P>,
    title: &str,
    kind: ScreenKind,
    mut rows_fn: FRows,
    mut on_side: FSide,
    mut on_confirm: FConfirm,
) where
    FRows: FnMut(&Session<P>) -> Vec<Row>,
    FSide: FnMut(&mut Session<P>, usize, i32),
    FConfirm: FnMut(&mut Session<P>, usize) -> bool,
{
    let mut prev = Buttons::NONE;
    let mut selected = 0_usize;
    let mut start = 0_usize;
    let mut dirty = true;

    let visible = ((s.surface.height / ROW_HEIGHT).saturating_sub(2) as usize).max(1);

    loop {
        let rows = rows_fn(s);
        if rows.is_empty() {
            return;
        }
        let count = rows.len();
        selected = selected.min(count - 1);

        let input = poll_menu_input(s, &mut prev);
        if input.pressed.pressed(JoypadButton::B) {
            return;
        }
        if s.quit {
            return;
        }

        if input.pressed.pressed(JoypadButton::Up) {
            selected = (selected + count - 1) % count;
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::Down) {
            selected = (selected + 1) % count;
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::Left)
            && matches!(kind, ScreenKind::Var | ScreenKind::Fixed)
        {
            on_side(s, selected, -1);
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::Right)
            && matches!(kind, ScreenKind::Var | ScreenKind::Fixed)
        {
            on_side(s, selected, 1);
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::X) && kind == ScreenKind::Input {
            on_side(s, selected, 0);
            dirty = true;
        } else if input.pressed.pressed(JoypadButton::A) {
            if on_confirm(s, selected) {
                return;
            }
            dirty = true;
        }

        // Scroll the viewport; selection wraps at both ends
        if selected < start {
            start = selected;
        } else if selected >= start + visible {
            start = selected - visible + 1;
        }

        if dirty {
            let rows = rows_fn(s);
            draw_screen(s, title, &rows, selected, start, visible);
            dirty = false;
        }
    }
}

fn draw_screen<P: Platform>(
    s: &mut Session<P>,
    title: &str,
    rows: &[Row],
    selected: usize,
    start: usize,
    visible: usize,
) {
    let s = &mut *s;
    s.surface.clear();
    s.platform.draw_text(&mut s.surface, title, PADDING as i32, 2, TextStyle::Medium);

    for (index, row) in rows.iter().enumerate().skip(start).take(visible) {
        let y = (ROW_HEIGHT + (index - start) as u32 * ROW_HEIGHT) as i32;
        let style =
            if index == selected { TextStyle::LargeInverted } else { TextStyle::Large };
        s.platform.draw_text(&mut s.surface, &row.label, PADDING as i32, y, style);

        if let Some(value) = &row.value {
            let x = s.surface.width - PADDING - s.platform.text_width(value, TextStyle::Large);
            s.platform.draw_text(&mut s.surface, value, x as i32, y, style);
        }
    }

    // Scroll indicators when rows overflow the viewport
    if start > 0 {
        let x = (s.surface.width / 2) as i32;
        s.platform.draw_text(&mut s.surface, "^", x, 2, TextStyle::Small);
    }
    if start + visible < rows.len() {
        let x = (s.surface.width / 2) as i32;
        let y = (s.surface.height - 10) as i32;
        s.platform.draw_text(&mut s.surface, "v", x, y, TextStyle::Small);
    }

    s.platform.flip(&s.surface);
}

/// Top options screen: frontend / emulator / controls / shortcuts / save.
fn options_menu<P: Platform>(s: &mut Session<P>) {
    let has_core_options = !s.config.core.is_empty();

    let mut entries = vec!["Frontend"];
    if has_core_options {
        entries.push("Emulator");
    }
    entries.extend(["Controls", "Shortcuts", "Save Changes"]);
    let entries: Vec<String> = entries.into_iter().map(String::from).collect();

    let rows: Vec<Row> =
        entries.iter().map(|label| Row { label: label.clone(), value: None }).collect();

    screen_loop(
        s,
        "Options",
        ScreenKind::List,
        move |_| rows.iter().map(|row| Row { label: row.label.clone(), value: None }).collect(),
        |_, _, _| {},
        move |s, index| {
            match entries[index].as_str() {
                "Frontend" => frontend_options_screen(s),
                "Emulator" => emulator_options_screen(s),
                "Controls" => bindings_screen(s, false),
                "Shortcuts" => bindings_screen(s, true),
                _ => save_changes_screen(s),
            }
            false
        },
    );
}

fn frontend_options_screen<P: Platform>(s: &mut Session<P>) {
    let keys: Vec<String> = s.config.frontend.enabled().map(|option| option.key.clone()).collect();

    let rows_keys = keys.clone();
    screen_loop(
        s,
        "Frontend",
        ScreenKind::Var,
        move |s| {
            rows_keys
                .iter()
                .filter_map(|key| s.config.frontend.get(key))
                .map(|option| Row {
                    label: option.name.clone(),
                    value: Some(option.label().to_string()),
                })
                .collect()
        },
        {
            let keys = keys.clone();
            move |s, index, direction| {
                let Some(key) = keys.get(index) else {
                    return;
                };
                if let Some(option) = s.config.frontend.get_mut(key) {
                    option.cycle(direction);
                }
                s.sync_frontend_option(key);
            }
        },
        |_, _| false,
    );
}

fn emulator_options_screen<P: Platform>(s: &mut Session<P>) {
    let keys: Vec<String> = s.config.core.enabled().map(|option| option.key.clone()).collect();

    let rows_keys = keys.clone();
    let info_keys = keys.clone();
    screen_loop(
        s,
        "Emulator",
        ScreenKind::Fixed,
        move |s| {
            rows_keys
                .iter()
                .filter_map(|key| s.config.core.get(key))
                .map(|option| Row {
                    label: option.name.clone(),
                    value: Some(option.label().to_string()),
                })
                .collect()
        },
        {
            let keys = keys.clone();
            move |s, index, direction| {
                let Some(key) = keys.get(index) else {
                    return;
                };
                if let Some(option) = s.config.core.get_mut(key) {
                    option.cycle(direction);
                    s.config.core.changed = true;
                }
                push_core_options(s);
            }
        },
        move |s, index| {
            if let Some(key) = info_keys.get(index) {
                if let Some(option) = s.config.core.get(key) {
                    let text = option.full.clone();
                    info_popup(s, &text);
                }
            }
            false
        },
    );
}

/// Push the config's core option state to the list the emulator polls.
fn push_core_options<P: Platform>(s: &mut Session<P>) {
    let mut options = s.core.runtime.core_options.lock().unwrap();
    *options = s.config.core.clone();
    options.changed = true;
}

fn info_popup<P: Platform>(s: &mut Session<P>, text: &str) {
    let mut prev = Buttons::NONE;
    {
        let s = &mut *s;
        s.surface.clear();
        for (index, line) in text.lines().enumerate() {
            let y = (PADDING + index as u32 * 14) as i32;
            s.platform.draw_text(&mut s.surface, line, PADDING as i32, y, TextStyle::Medium);
        }
        s.platform.flip(&s.surface);
    }

    loop {
        let input = poll_menu_input(s, &mut prev);
        if input.pressed.pressed(JoypadButton::A) || input.pressed.pressed(JoypadButton::B) {
            return;
        }
        if s.quit {
            return;
        }
    }
}

/// Control or shortcut remapping screen. Confirming a row waits for the
/// next button press and records it (with the menu modifier when the menu
/// button is held); X clears the binding.
fn bindings_screen<P: Platform>(s: &mut Session<P>, shortcuts: bool) {
    let indices: Vec<usize> = {
        let mappings = if shortcuts { &s.config.shortcuts } else { &s.config.controls };
        mappings
            .iter()
            .enumerate()
            .filter(|(_, mapping)| !mapping.ignored)
            .map(|(index, _)| index)
            .collect()
    };

    let rows_indices = indices.clone();
    let side_indices = indices.clone();
    let confirm_indices = indices;
    let title = if shortcuts { "Shortcuts" } else { "Controls" };

    screen_loop(
        s,
        title,
        ScreenKind::Input,
        move |s| {
            let mappings = if shortcuts { &s.config.shortcuts } else { &s.config.controls };
            rows_indices
                .iter()
                .map(|&index| Row {
                    label: mappings[index].name.clone(),
                    value: Some(mappings[index].encode()),
                })
                .collect()
        },
        move |s, row, _| {
            // X: unbind
            if let Some(&index) = side_indices.get(row) {
                let mappings =
                    if shortcuts { &mut s.config.shortcuts } else { &mut s.config.controls };
                mappings[index].clear();
            }
        },
        move |s, row| {
            if let Some(&index) = confirm_indices.get(row) {
                if let Some((button, modifier)) = await_binding(s) {
                    let mappings =
                        if shortcuts { &mut s.config.shortcuts } else { &mut s.config.controls };
                    mappings[index].local = Some(button);
                    mappings[index].modifier = modifier;
                }
            }
            false
        },
    );
}

/// Block until any joypad button is pressed; MENU+button records a
/// modifier binding, MENU alone cancels.
fn await_binding<P: Platform>(s: &mut Session<P>) -> Option<(JoypadButton, bool)> {
    let mut prev = s.platform.poll_input();

    loop {
        if s.quit {
            return None;
        }
        s.platform.vsync_wait(16);
        let buttons = s.platform.poll_input();
        let pressed = buttons.just_pressed(prev);

        for button in JoypadButton::ALL {
            if button == JoypadButton::Menu || button.retro_id().is_none() {
                continue;
            }
            if pressed.pressed(button) {
                return Some((button, buttons.pressed(JoypadButton::Menu)));
            }
        }

        // Releasing MENU without another press cancels the capture
        if prev.pressed(JoypadButton::Menu) && !buttons.pressed(JoypadButton::Menu) {
            return None;
        }

        prev = buttons;
    }
}

/// Save-changes prompt: console-wide, per-game, or restore defaults.
fn save_changes_screen<P: Platform>(s: &mut Session<P>) {
    let entries = ["Save for console", "Save for game", "Restore defaults"];

    screen_loop(
        s,
        "Save Changes",
        ScreenKind::List,
        move |_| {
            entries.iter().map(|label| Row { label: (*label).to_string(), value: None }).collect()
        },
        |_, _, _| {},
        move |s, index| {
            let paths = s.config_paths.clone();
            let result = match index {
                0 => s.config.write(&paths, false),
                1 => s.config.write(&paths, true),
                _ => s.config.restore_defaults(&paths).map(|()| {
                    for key in [
                        fe::KEY_SCALING,
                        fe::KEY_EFFECT,
                        fe::KEY_SHARPNESS,
                        fe::KEY_TEARING,
                        fe::KEY_OVERCLOCK,
                        fe::KEY_THREAD,
                        fe::KEY_DEBUG,
                        fe::KEY_MAX_FF,
                    ] {
                        s.sync_frontend_option(key);
                    }
                    push_core_options(s);
                    s.renderer.invalidate();
                }),
            };
            if let Err(err) = result {
                log::error!("Config write failed: {err}");
            }
            true
        },
    );
}
