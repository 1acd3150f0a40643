extern crate urdf_scene;

use std::env;
use std::path::Path;
use std::process::exit;
use urdf_scene::robot_modules::robot_model_module::RobotModelModule;
use urdf_scene::utils::utils_console::{urdf_error, urdf_print, PrintColor, PrintMode};
use urdf_scene::utils::utils_files::FileUtils;

fn main () {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        urdf_error("Usage: print_urdf_info <file.urdf> [--json]");
        exit(2);
    }
    let json = args.len() == 3 && args[2] == "--json";

    let text = match FileUtils::read_file_contents_to_string(Path::new(&args[1])) {
        Ok(t) => { t }
        Err(e) => { urdf_error(&e.to_string()); exit(1); }
    };

    // parse and resolve the robot without materializing it
    let start = instant::Instant::now();
    let robot = match RobotModelModule::build_robot(&text) {
        Ok(r) => { r }
        Err(e) => { urdf_error(&e.to_string()); exit(1); }
    };
    let build_time = start.elapsed();

    if json {
        match robot.to_json_summary() {
            Ok(s) => { println!("{}", s); }
            Err(e) => { urdf_error(&e.to_string()); exit(1); }
        }
    } else {
        robot.print_summary();
        urdf_print(&format!("built in {:?}", build_time), PrintMode::Println, PrintColor::Cyan, false);
    }
}
