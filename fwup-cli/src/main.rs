fn main() -> anyhow::Result<()> {
    fwup_cli::run()
}
