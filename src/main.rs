fn main() {
    bids_normalizer::cli::run();
}
