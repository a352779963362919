fn main() {
    if let Err(err) = medallion_managed::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
