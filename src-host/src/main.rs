fn main() -> anyhow::Result<()> {
    talentbridge_host_lib::run()
}
