fn main() -> anyhow::Result<()> {
    checklist_tui::cli::run()
}
