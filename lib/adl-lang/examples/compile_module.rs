use std::fs;

use adl_lang::passes::{LoaderOptions, ModuleLoader};
use tempfile::TempDir;

pub fn main() {
    let src = r#"
        module picture {

        /// A point in 2D space.
        struct Point {
            Double x;
            Double y;
        };

        union Shape {
            Circle circle;
            Vector<Point> polygon;
        };

        struct Circle {
            Point center;
            Double radius = 1;
        };
        }
    "#;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("picture.adl");
    fs::write(&root, src).unwrap();

    let mut loader = ModuleLoader::new(LoaderOptions {
        search_path: vec![dir.path().to_path_buf()],
        merge_exts: vec![],
    });
    loader.load_root_file(&root).unwrap();
    let adl = loader.into_loaded();

    let module = adl.user_modules().next().unwrap();
    println!("{}", serde_json::to_string_pretty(module).unwrap());
}
