mod geometry;

use std::env;
use std::fs;
use std::process::exit;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: geom_test <countries.geojson> [lon lat]");
        eprintln!("Prints per-country bounding boxes; with a coordinate, also which country contains it.");
        exit(1);
    }

    let text = match fs::read_to_string(&args[1]) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Cannot read {}: {}", args[1], err);
            exit(1);
        }
    };

    let countries = match geometry::parse_countries(&text) {
        Ok(countries) => countries,
        Err(err) => {
            eprintln!("Parse error: {}", err);
            exit(1);
        }
    };

    println!("{} country features", countries.len());
    for country in &countries {
        let Some(b) = country.geometry.bounding_box() else { continue };
        println!(
            "{}  lon [{:8.3}, {:8.3}]  lat [{:7.3}, {:7.3}]  fill tris {:5}  {}",
            country.code,
            b.min_lon,
            b.max_lon,
            b.min_lat,
            b.max_lat,
            country.geometry.fill_triangles().len(),
            country.name.as_deref().unwrap_or("-"),
        );
    }

    if args.len() >= 4 {
        let (lon, lat) = match (args[2].parse::<f64>(), args[3].parse::<f64>()) {
            (Ok(lon), Ok(lat)) => (lon, lat),
            _ => {
                eprintln!("Coordinates must be numeric: {} {}", args[2], args[3]);
                exit(1);
            }
        };
        match countries.iter().find(|c| c.geometry.contains_point(lon, lat)) {
            Some(c) => println!(
                "({}, {}) is inside {} ({})",
                lon,
                lat,
                c.code,
                c.name.as_deref().unwrap_or("-")
            ),
            None => println!("({}, {}) is not inside any country", lon, lat),
        }
    }
}
