use paperkg::config::Config;
use paperkg::db::Db;
use paperkg::graph::{count_entities_by_type, count_relationships_by_type};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(&config.paperkg.db_path);

    println!("\n=== Paperkg Graph Statistics ===\n");

    let entity_counts = count_entities_by_type(&db).await?;
    let total_entities: i64 = entity_counts.iter().map(|(_, c)| c).sum();

    if total_entities == 0 {
        println!("The graph store is empty.");
        println!("\nRun `construct <paper.md>` to build a knowledge graph.");
        return Ok(());
    }

    println!("Entities by type:\n");
    println!("{:-<40}", "");
    println!("{:<28} {:>10}", "Type", "Count");
    println!("{:-<40}", "");
    for (entity_type, count) in &entity_counts {
        if *count > 0 {
            println!("{:<28} {:>10}", entity_type.as_str(), count);
        }
    }
    println!("{:-<40}", "");
    println!("{:<28} {:>10}", "Total", total_entities);

    let relationship_counts = count_relationships_by_type(&db).await?;
    let total_relationships: i64 = relationship_counts.iter().map(|(_, c)| c).sum();

    println!("\nRelationships by type:\n");
    println!("{:-<40}", "");
    println!("{:<28} {:>10}", "Type", "Count");
    println!("{:-<40}", "");
    for (rel_type, count) in &relationship_counts {
        if *count > 0 {
            println!("{:<28} {:>10}", rel_type.as_str(), count);
        }
    }
    println!("{:-<40}", "");
    println!("{:<28} {:>10}", "Total", total_relationships);
    println!();

    Ok(())
}
