fn main() -> anyhow::Result<()> {
    memopad::cli::run()
}
