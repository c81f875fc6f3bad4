use response_envelope::app;

fn main() -> anyhow::Result<()> {
    app::run()
}
