//! # Demo Data Loader
//!
//! Populates an empty database with the restaurant's demo catalogue and one
//! week of activity, then prints the week's report as JSON.
//!
//! ## Usage
//! ```bash
//! # Use larder.toml / LARDER_* settings
//! cargo run -p larder-db --bin seed
//!
//! # Specify database path
//! cargo run -p larder-db --bin seed -- --db ./data/larder.db
//!
//! # Simulate another week and report only the evening service
//! cargo run -p larder-db --bin seed -- --start 2025-09-01 --window 18:00-23:30
//! ```
//!
//! ## Loaded Data
//! - ~55 ingredients, all stocked in the storeroom
//! - 8 dishes with their bills of materials
//! - 16 bar drinks, one cashier
//! - a week of transfers, sales, deliveries and closed cash sessions
//!
//! Does nothing when the database already has ingredients.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use larder_core::recipe::{requirements, RecipeLineInput};
use larder_core::reconcile::{CloseSessionInput, SessionLineInput};
use larder_core::report::{ReportPeriod, TimeWindow};
use larder_core::validation::{parse_date, parse_time};
use larder_core::{Drink, Money, Quantity, Recipe, TransferDirection};
use larder_db::{init_tracing, AppConfig, Database, IngredientInput};

/// (key, name, unit, storeroom stock). Keys only tie recipe lines to rows.
const INGREDIENTS: &[(u32, &str, &str, &str)] = &[
    (1, "Riz", "kg", "1000"),
    (2, "Amanvivè", "Unité", "1000"),
    (3, "Tchayo", "Unité", "1000"),
    (4, "Goussi", "Unité", "1000"),
    (5, "Poisson Fumé", "Unité", "1000"),
    (6, "Farine de maïs", "Unité", "1000"),
    (7, "Cossette de Manioc", "Unité", "1000"),
    (8, "Huile rouge", "L", "1000"),
    (9, "Huile d'arachide", "L", "1000"),
    (11, "Banane plantain", "Unité", "1000"),
    (12, "Fromage", "Unité", "1000"),
    (13, "Couscous", "Unité", "1000"),
    (14, "Sardine", "Unité", "1000"),
    (15, "Œuf", "Unité", "1000"),
    (17, "Pâte spaghetti", "Unité", "1000"),
    (18, "Mayonnaise", "Unité", "1000"),
    (19, "Viande Spaghettis", "Unité", "1000"),
    (20, "Viande Shawarma", "Unité", "1000"),
    (21, "Viande de mouton", "Unité", "1000"),
    (22, "Pains libanais", "Unité", "1000"),
    (23, "Viande gbota", "Unité", "1000"),
    (24, "Asrokouin", "Unité", "1000"),
    (25, "Crabe", "Unité", "1000"),
    (26, "Peau", "Unité", "1000"),
    (28, "Tomate en boîte", "Unité", "1000"),
    (29, "Poisson Sylvie 1000", "Unité", "1000"),
    (30, "Poisson Sylvie 1500", "Unité", "1000"),
    (31, "Poisson Sylvie 2000", "Unité", "1000"),
    // second supplier, same label
    (32, "Poisson Sylvie 2000", "Unité", "1000"),
    (33, "Poisson Bar 400g", "Unité", "1000"),
    (34, "Akassa", "Unité", "1000"),
    (35, "Gari", "Unité", "1000"),
    (36, "Bouillon", "Unité", "1000"),
    (37, "Gésier", "Unité", "1000"),
    (38, "Poulet Bicyclette", "Unité", "1000"),
    (39, "Coquelet", "Unité", "1000"),
    (40, "Aileron 1500", "Unité", "1000"),
    (41, "Aileron 2000", "Unité", "1000"),
    (42, "Aileron 2500", "Unité", "1000"),
    (43, "Petit Pois surgelé", "Unité", "1000"),
    (44, "Petit Pois en boîte", "Unité", "1000"),
    (45, "Pomme de terre", "Unité", "1000"),
    (46, "Laitue", "g", "1000"),
    (48, "Concombre", "kg", "1000"),
    (49, "Carotte", "kg", "1000"),
    (50, "Sauce Shawarma", "L", "1000"),
    (51, "Vinaigrette", "L", "1000"),
    (52, "Poivron", "g", "1000"),
    (53, "Choux", "kg", "1000"),
    (54, "Oignon", "kg", "1000"),
    (55, "Sel", "kg", "1000"),
    (56, "Spaghettis", "kg", "1000"),
    (57, "Frite", "g", "10000"),
    (58, "Coquillettes", "g", "1000"),
];

const LEGUME_ROUGE_PATE: &[(u32, &str)] = &[
    (2, "1"), (3, "1"), (4, "1"), (5, "1"), (6, "1"),
    (8, "0.04"), (12, "2"), (54, "0.1"), (55, "0.01"),
];
const LEGUME_ROUGE_TELIBO: &[(u32, &str)] = &[
    (2, "1"), (3, "1"), (4, "1"), (5, "1"), (7, "1"),
    (8, "0.05"), (12, "1"), (54, "0.05"), (55, "0.01"),
];
const LEGUME_BLANC_PATE: &[(u32, &str)] = &[
    (2, "1"), (3, "1"), (4, "1"), (5, "1"), (6, "1"),
    (9, "0.03"), (12, "2"), (54, "0.1"), (55, "0.01"),
];
const LEGUME_BLANC_TELIBO: &[(u32, &str)] = &[
    (2, "1"), (3, "1"), (4, "1"), (5, "1"), (7, "1"),
    (9, "0.05"), (12, "1"), (54, "0.05"), (55, "0.01"),
];
const SPAGHETTI_LOTUS_BLANC: &[(u32, &str)] = &[
    (9, "0.05"), (15, "1"), (19, "1"), (43, "1"), (49, "0.05"), (52, "0.02"),
    (53, "0.05"), (54, "0.05"), (55, "0.01"), (56, "0.1"), (57, "125"),
];
const SPAGHETTI_ROUGE_OMELETTE: &[(u32, &str)] = &[
    (9, "0.05"), (15, "1"), (19, "1"), (28, "0.2"), (43, "1"), (49, "0.05"),
    (52, "0.02"), (53, "0.05"), (54, "0.05"), (55, "0.01"), (56, "0.1"),
];
const SPAGHETTI_LOTUS_ROUGE: &[(u32, &str)] = &[
    (9, "0.05"), (15, "1"), (19, "1"), (28, "0.2"), (43, "1"), (49, "0.05"),
    (52, "0.02"), (53, "0.05"), (54, "0.05"), (55, "0.01"), (56, "0.1"), (57, "125"),
];
const CHAWARMA: &[(u32, &str)] = &[(20, "1")];

const RECIPES: &[(&str, &[(u32, &str)])] = &[
    ("Légume rouge + pâte blanche", LEGUME_ROUGE_PATE),
    ("Légume rouge + Telibo", LEGUME_ROUGE_TELIBO),
    ("Légume blanc + pâte blanche", LEGUME_BLANC_PATE),
    ("Légume blanc + Telibo", LEGUME_BLANC_TELIBO),
    ("Spaghettis Lotus Blanc", SPAGHETTI_LOTUS_BLANC),
    ("Spaghettis Rouge Viande Omelette", SPAGHETTI_ROUGE_OMELETTE),
    ("Spaghettis Lotus Rouge", SPAGHETTI_LOTUS_ROUGE),
    ("Chawarma Lotus", CHAWARMA),
];

/// Bar menu, prices in FCFA.
const DRINKS: &[(&str, i64)] = &[
    ("Béninoise 60", 600),
    ("Béninoise 33", 350),
    ("Aquabell", 600),
    ("Awooyo", 1000),
    ("BB lager 60", 800),
    ("Beaufort 33", 500),
    ("Beaufort 50", 600),
    ("Buldozer", 800),
    ("Castel 50", 600),
    ("Chill 33", 400),
    ("Chill 50", 600),
    ("Coca 60", 500),
    ("Comtesse eau", 600),
    ("Comtesse fruit", 600),
    ("Desperados bouteille", 2000),
    ("Doppel Energy", 600),
];

const CASHIER: &str = "Archange";

/// Days of simulated activity from the first demo day (a Monday by default).
const DEMO_DAYS: i64 = 7;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut config = AppConfig::load().context("loading configuration")?;
    let mut first_day = NaiveDate::from_ymd_opt(2025, 8, 4).context("demo start date")?;
    let mut window = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--start" | "-s" => {
                let value = args.get(i + 1).context("--start needs a date")?;
                first_day = parse_date("--start", value)?;
                i += 1;
            }
            "--window" | "-w" => {
                let value = args.get(i + 1).context("--window needs FROM-TO")?;
                window = Some(parse_window(value)?);
                i += 1;
            }
            "--help" | "-h" => {
                println!("Larder demo data loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>            Database file path (default: from larder.toml or larder.db)");
                println!("  -s, --start <YYYY-MM-DD>   First simulated day (default: 2025-08-04)");
                println!("  -w, --window <HH:MM-HH:MM> Restrict the printed report to a time of day");
                println!("  -h, --help                 Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    init_tracing(&config.log_filter);

    println!("Larder demo data loader");
    println!("=======================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;

    let existing = db.ingredients().count().await?;
    if existing > 0 {
        println!("Database already has {existing} ingredients, nothing to do.");
        println!("Delete the database file to reload the demo data.");
        return Ok(());
    }

    let ingredient_ids = load_ingredients(&db).await?;
    println!("✓ {} ingredients", ingredient_ids.len());

    let recipes = load_recipes(&db, &ingredient_ids).await?;
    println!("✓ {} recipes", recipes.len());

    let mut drinks = Vec::with_capacity(DRINKS.len());
    for (name, price) in DRINKS {
        drinks.push(db.drinks().create(name, Money::from_minor(*price)).await?);
    }
    db.cashiers().find_or_create(CASHIER).await?;
    println!("✓ {} drinks, cashier {CASHIER}", drinks.len());


    simulate_kitchen(&db, &recipes, first_day).await?;
    simulate_bar(&db, &drinks, first_day).await?;
    println!("✓ {DEMO_DAYS} days of activity");

    let last_day = first_day + Duration::days(DEMO_DAYS - 1);
    let mut period = ReportPeriod::new(first_day, last_day)?;
    if let Some(window) = window {
        period = period.with_time_window(window);
    }
    let report = db.reports().period_report(period).await?;

    println!();
    println!(
        "Bar: expected {}, declared {}, variance {}",
        config.format_money(report.bar.totals.expected.minor()),
        config.format_money(report.bar.totals.declared_actual.minor()),
        config.format_money(report.bar.totals.variance.minor()),
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);

    db.close().await;
    Ok(())
}

/// `HH:MM-HH:MM`; a window ending before it starts runs past midnight.
fn parse_window(value: &str) -> anyhow::Result<TimeWindow> {
    let (from, to) = value
        .split_once('-')
        .with_context(|| format!("--window expects HH:MM-HH:MM, got {value}"))?;
    Ok(TimeWindow::new(parse_time("--window", from)?, parse_time("--window", to)?))
}

async fn load_ingredients(db: &Database) -> anyhow::Result<HashMap<u32, String>> {
    let mut ids = HashMap::with_capacity(INGREDIENTS.len());
    for (key, name, unit, storeroom) in INGREDIENTS {
        let input = IngredientInput::new(*name, *unit).storeroom(storeroom.parse::<Quantity>()?);
        let ingredient = db.ingredients().create(&input).await?;
        ids.insert(*key, ingredient.id);
    }
    Ok(ids)
}

async fn load_recipes(db: &Database, ingredient_ids: &HashMap<u32, String>) -> anyhow::Result<Vec<Recipe>> {
    let mut recipes = Vec::with_capacity(RECIPES.len());
    for (name, doses) in RECIPES {
        let mut lines = Vec::with_capacity(doses.len());
        for (key, dose) in doses.iter() {
            let ingredient_id = ingredient_ids
                .get(key)
                .with_context(|| format!("recipe {name} names unknown ingredient {key}"))?;
            lines.push(RecipeLineInput {
                ingredient_id: ingredient_id.clone(),
                quantity: dose.parse()?,
            });
        }
        recipes.push(db.recipes().create(name, &lines).await?);
    }
    Ok(recipes)
}

/// Each morning: move the day's needs (+10%) to the kitchen, then sell.
async fn simulate_kitchen(db: &Database, recipes: &[Recipe], first_day: NaiveDate) -> anyhow::Result<()> {
    for offset in 0..DEMO_DAYS {
        let day = first_day + Duration::days(offset);
        let plan: Vec<(&Recipe, i64)> = recipes
            .iter()
            .enumerate()
            .map(|(idx, recipe)| (recipe, 1 + (offset + idx as i64) % 4))
            .collect();

        let mut needed: BTreeMap<String, Quantity> = BTreeMap::new();
        for (recipe, quantity) in &plan {
            for (ingredient_id, amount) in requirements(&recipe.lines, *quantity)? {
                *needed.entry(ingredient_id).or_default() += amount;
            }
        }

        let morning = Utc
            .from_local_datetime(&day.and_hms_opt(7, 30, 0).context("demo time")?)
            .single()
            .context("demo time")?;
        for (ingredient_id, amount) in &needed {
            let with_margin = Quantity::from_milli(amount.milli() * 11 / 10);
            db.transfers()
                .transfer_at(ingredient_id, with_margin, TransferDirection::StoreroomToKitchen, morning)
                .await?;
        }

        for (slot, (recipe, quantity)) in plan.iter().enumerate() {
            let sold_at = morning + Duration::hours(4) + Duration::minutes(35 * slot as i64);
            db.sales().sell_at(&recipe.id, *quantity, sold_at).await?;
        }
    }
    Ok(())
}

/// A delivery of 48 of each drink on the first day, then one session per evening.
async fn simulate_bar(db: &Database, drinks: &[Drink], first_day: NaiveDate) -> anyhow::Result<()> {
    let note = format!("Livraison sem. {}", first_day.format("%d/%m/%Y"));
    for drink in drinks {
        db.deliveries()
            .record(&drink.id, Quantity::from_units(48), first_day, Some(note.as_str()))
            .await?;
    }

    let mut on_shelf: HashMap<&str, i64> = HashMap::new();
    for offset in 0..DEMO_DAYS {
        let day = first_day + Duration::days(offset);
        let delivered = if offset == 0 { 48 } else { 0 };

        let mut expected = 0;
        let mut lines = Vec::with_capacity(drinks.len());
        for (idx, drink) in drinks.iter().enumerate() {
            let opening = on_shelf.get(drink.id.as_str()).copied().unwrap_or(0);
            let available = opening + delivered;
            let sold = ((offset + idx as i64) % 5 + 1).min(available);
            let closing = available - sold;
            on_shelf.insert(&drink.id, closing);
            expected += sold * drink.unit_price.minor();

            lines.push(SessionLineInput {
                drink_id: drink.id.clone(),
                opening: None,
                delivered: None,
                closing: Some(Quantity::from_units(closing)),
            });
        }

        // one short till every third evening
        let shortfall = if offset % 3 == 2 { 500 } else { 0 };
        db.sessions()
            .close(&CloseSessionInput {
                cashier_name: CASHIER.to_string(),
                period_start: day,
                period_end: day,
                declared_actual: Money::from_minor(expected - shortfall),
                lines,
            })
            .await?;
    }
    Ok(())
}
