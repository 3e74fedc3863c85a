use anyhow::Result;

use crate::app::App;

pub async fn cmd_authorities(app: &App) -> Result<()> {
    println!("authorities with hand-written adapters:");
    for authority in app.registry.authorities() {
        println!("  {authority}");
    }
    println!("(all other authorities use the generic recipe path)");
    Ok(())
}
