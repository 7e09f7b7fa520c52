use anyhow::Result;
use hgtstitch::TileCoord;

pub fn run(name: &str) -> Result<()> {
    match TileCoord::parse(name) {
        Ok(coord) => {
            println!(
                "{name}: valid (southwest corner {}, {})",
                coord.lat, coord.lon
            );
            Ok(())
        }
        Err(e) => {
            println!("{name}: invalid ({e})");
            std::process::exit(1);
        }
    }
}
