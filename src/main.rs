fn main() {
    env_logger::init();
    range_ev::cli::run();
}
