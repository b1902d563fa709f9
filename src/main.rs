fn main() {
    if let Err(err) = vinoteca::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
