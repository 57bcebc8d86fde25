use galyn::{config::Config, db::Db, error::GalynError};
use galyn::relations::{relationship_graph, word_cloud, RelationFilter};

const TOP_N: usize = 15;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    println!("\n=== Galyn Relationship Statistics ===\n");

    let (stories, relationships, blank) = db.with_connection(|conn| {
        let stories: i64 = conn.query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        let relationships: i64 = conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?;
        let blank: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relationships \
             WHERE COALESCE(subject_desc, '') = '' OR COALESCE(object_desc, '') = ''",
            [],
            |row| row.get(0),
        )?;
        Ok::<_, GalynError>((stories, relationships, blank))
    }).await?;

    println!("Stories:                {:>8}", stories);
    println!("Relationship records:   {:>8}", relationships);
    println!("  without subject/object: {:>6}", blank);

    if relationships == 0 {
        println!("\nNo relationship records found.");
        return Ok(());
    }

    let graph = relationship_graph(&db, &RelationFilter::none()).await?;
    println!("Graph nodes:            {:>8}", graph.nodes.len());
    println!("Graph links:            {:>8}", graph.links.len());

    let mut nodes: Vec<_> = graph.nodes.iter().collect();
    nodes.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));

    println!("\nMost connected participants:\n");
    println!("{:-<60}", "");
    println!("{:<48} {:>10}", "Participant", "Count");
    println!("{:-<60}", "");
    for node in nodes.iter().take(TOP_N) {
        println!("{:<48} {:>10}", truncate(&node.name, 48), node.value);
    }
    println!("{:-<60}", "");

    let mut links: Vec<_> = graph.links.iter().collect();
    links.sort_by(|a, b| b.value.cmp(&a.value));

    println!("\nStrongest relationships:\n");
    println!("{:-<80}", "");
    println!("{:<34} {:<34} {:>10}", "Source", "Target", "Count");
    println!("{:-<80}", "");
    for link in links.iter().take(TOP_N) {
        println!(
            "{:<34} {:<34} {:>10}",
            truncate(&link.source_name, 34),
            truncate(&link.target_name, 34),
            link.value
        );
    }
    println!("{:-<80}", "");

    let mut words = word_cloud(&db).await?;
    words.sort_by(|a, b| b.count.cmp(&a.count));
    if !words.is_empty() {
        println!("\nMost frequent descriptions:\n");
        for word in words.iter().take(TOP_N) {
            println!("  {:<40} {:>8}", truncate(&word.word, 40), word.count);
        }
    }

    println!();
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
