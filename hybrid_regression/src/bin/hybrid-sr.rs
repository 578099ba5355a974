fn main() -> anyhow::Result<()> {
    hybrid_regression::cli::run()
}
