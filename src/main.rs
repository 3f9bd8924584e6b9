use boxstream::app::{self, SceneConfig};

fn main() -> anyhow::Result<()> {
    app::run(SceneConfig::default())
}
