#[cfg(not(target_arch = "wasm32"))]
use colored::Colorize;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Prints the given string with the given color.
///
/// ## Example
/// ```
/// use urdf_scene::utils::utils_console::{urdf_print, PrintMode, PrintColor};
/// urdf_print("test", PrintMode::Println, PrintColor::Blue, false);
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub fn urdf_print(s: &str, mode: PrintMode, color: PrintColor, bolded: bool) {
    let mut string = match &color {
        PrintColor::None => { s.normal() }
        c => {
            let t = c.get_color_triple();
            s.truecolor(t.0, t.1, t.2)
        }
    };
    if bolded { string = string.bold(); }
    match mode {
        PrintMode::Println => { println!("{}", string); }
        PrintMode::Print => { print!("{}", string); }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

#[cfg(target_arch = "wasm32")]
#[allow(unused)]
pub fn urdf_print(s: &str, mode: PrintMode, color: PrintColor, bolded: bool) {
    log(s);
}

pub fn urdf_print_new_line() {
    urdf_print("\n", PrintMode::Print, PrintColor::None, false);
}

/// Per-element degradations (bad vectors, dangling references, unknown joint types) end up here.
pub fn urdf_warn(s: &str) {
    urdf_print(&format!("WARNING: {}", s), PrintMode::Println, PrintColor::Yellow, false);
}

/// Informational messages that are not degradations, e.g. a joint type with no gizmo.
pub fn urdf_notice(s: &str) {
    urdf_print(s, PrintMode::Println, PrintColor::Cyan, false);
}

pub fn urdf_error(s: &str) {
    urdf_print(s, PrintMode::Println, PrintColor::Red, true);
}

/// Println will cause a new line after each line, while Print will not.
#[derive(Clone, Debug)]
pub enum PrintMode {
    Println,
    Print
}

/// Defines color for a print command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrintColor {
    None,
    Blue,
    Green,
    Red,
    Yellow,
    Cyan,
    Magenta
}
impl PrintColor {
    pub fn get_color_triple(&self) -> (u8, u8, u8) {
        match self {
            PrintColor::None => { (0,0,0) }
            PrintColor::Blue => { return (0, 0, 255) }
            PrintColor::Green => { return (0, 255, 0) }
            PrintColor::Red => { return (255, 0, 0) }
            PrintColor::Yellow => { return (255, 255, 0) }
            PrintColor::Cyan => { return (0, 255, 255) }
            PrintColor::Magenta => { return (255, 0, 255) }
        }
    }
}
