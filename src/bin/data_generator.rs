use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const CITIES: [&str; 6] = [
    "Coyoacan",
    "Roma",
    "Condesa",
    "Polanco",
    "Del Valle",
    "Narvarte",
];

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("data/students.csv");
    let rows: u64 = args
        .get(2)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1_000_000);

    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    let mut writer = BufWriter::new(file);

    writeln!(writer, "id,name,age,city,study_hours,stress").unwrap();

    let mut rng = rand::rng();
    for i in 0..rows {
        let age = rng.random_range(15..80);
        let city = CITIES[rng.random_range(0..CITIES.len())];
        let study_hours: f64 = rng.random_range(0.0..12.0);
        let stress = rng.random_range(1..11);
        writeln!(
            writer,
            "{i},student_{i},{age},{city},{study_hours:.1},{stress}"
        )
        .unwrap();
    }
    writer.flush().unwrap();

    println!("Sample CSV generated: {path} ({rows} rows)");
}
