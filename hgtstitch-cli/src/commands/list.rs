use anyhow::Result;
use hgtstitch::is_valid_filename;
use std::path::PathBuf;

pub fn run(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = super::resolve_data_dir(data_dir)?;

    let mut tiles = Vec::new();
    for entry in std::fs::read_dir(&data_dir)?.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".hgt") && is_valid_filename(&name) {
            tiles.push(name.to_string());
        }
    }
    tiles.sort();

    if tiles.is_empty() {
        println!("No tiles in {}", data_dir.display());
        return Ok(());
    }

    for tile in &tiles {
        println!("{tile}");
    }
    println!("\n{} tile(s) in {}", tiles.len(), data_dir.display());

    Ok(())
}
