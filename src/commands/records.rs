use clap::Args;
use std::error::Error;
use std::io::{self, Write};

use sheetdb_core::{GridClient, Record, Store, Value};

use super::fields::{format_record, matches_all, parse_assignment, parse_records};
use super::OutputFormat;

/// List collections (one per sheet)
#[derive(Args)]
pub struct ListCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl ListCommand {
    pub async fn run<G: GridClient>(&self, store: &Store<G>) -> Result<(), Box<dyn Error>> {
        let sheets: Vec<_> = store
            .registry()
            .iter()
            .filter_map(|c| c.sheet())
            .collect();

        if sheets.is_empty() {
            println!("No collections found");
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&sheets)?);
            }
            OutputFormat::Text => {
                println!("{:<30}  {:>8}  {:>8}", "COLLECTION", "ROWS", "COLUMNS");
                println!("{}", "-".repeat(50));
                for sheet in &sheets {
                    println!(
                        "{:<30}  {:>8}  {:>8}",
                        sheet.title, sheet.row_count, sheet.column_count
                    );
                }
                println!("\nTotal: {} collection(s)", sheets.len());
            }
        }
        Ok(())
    }
}

/// Find records in a collection
#[derive(Args)]
pub struct FindCommand {
    /// Collection name
    pub collection: String,

    /// Only records whose FIELD equals VALUE (can be repeated)
    #[arg(long = "where", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    pub filters: Vec<(String, Value)>,

    /// Show only the first match
    #[arg(long)]
    pub first: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl FindCommand {
    pub async fn run<G: GridClient>(&self, store: &mut Store<G>) -> Result<(), Box<dyn Error>> {
        let filters = &self.filters;
        let records: Vec<Record> = if self.first {
            store
                .find_one(&self.collection, |r, _, _| matches_all(r, filters))
                .await?
                .into_iter()
                .collect()
        } else {
            store
                .find(&self.collection, |r, _, _| matches_all(r, filters))
                .await?
        };

        if records.is_empty() {
            println!("No records found");
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            OutputFormat::Text => {
                for record in &records {
                    println!("{}", format_record(record));
                }
                println!("\nTotal: {} record(s)", records.len());
            }
        }
        Ok(())
    }
}

/// Insert records, creating the collection if needed
#[derive(Args)]
pub struct InsertCommand {
    /// Collection name
    pub collection: String,

    /// Field to set (can be repeated)
    #[arg(
        long = "set",
        value_name = "FIELD=VALUE",
        value_parser = parse_assignment,
        required_unless_present = "json",
        conflicts_with = "json"
    )]
    pub fields: Vec<(String, Value)>,

    /// A JSON object, or an array of objects for several records
    #[arg(long)]
    pub json: Option<String>,
}

impl InsertCommand {
    pub async fn run<G: GridClient>(&self, store: &mut Store<G>) -> Result<(), Box<dyn Error>> {
        let mut records = match &self.json {
            Some(json) => parse_records(json)?,
            None => vec![self.fields.iter().cloned().collect::<Record>()],
        };

        let written = store.insert_many(&self.collection, &mut records).await?;
        println!("Inserted {} record(s) into '{}':", written, self.collection);
        for record in &records {
            println!("  {}", format_record(record));
        }
        Ok(())
    }
}

/// Update the record at a position
#[derive(Args)]
pub struct UpdateCommand {
    /// Collection name
    pub collection: String,

    /// Record position (the `_index` shown by find)
    pub index: usize,

    /// Field to set (can be repeated)
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment, required = true)]
    pub fields: Vec<(String, Value)>,
}

impl UpdateCommand {
    pub async fn run<G: GridClient>(&self, store: &mut Store<G>) -> Result<(), Box<dyn Error>> {
        let index = self.index;
        let mut record = store
            .find_one(&self.collection, move |_, i, _| i == index)
            .await?
            .ok_or_else(|| format!("No record at index {} in '{}'", index, self.collection))?;

        for (field, value) in &self.fields {
            record.set(field.clone(), value.clone());
        }
        store.update(&self.collection, &record).await?;

        println!("Updated record:");
        println!("  {}", format_record(&record));
        Ok(())
    }
}

/// Delete matching records
#[derive(Args)]
pub struct DeleteCommand {
    /// Collection name
    pub collection: String,

    /// Only records whose FIELD equals VALUE (can be repeated)
    #[arg(long = "where", value_name = "FIELD=VALUE", value_parser = parse_assignment, required = true)]
    pub filters: Vec<(String, Value)>,

    /// Skip confirmation prompt
    #[arg(long, short)]
    pub force: bool,
}

impl DeleteCommand {
    pub async fn run<G: GridClient>(&self, store: &mut Store<G>) -> Result<(), Box<dyn Error>> {
        let filters = &self.filters;
        let matching = store
            .find(&self.collection, |r, _, _| matches_all(r, filters))
            .await?;
        if matching.is_empty() {
            println!("No matching records");
            return Ok(());
        }

        // Confirm deletion unless --force is used
        if !self.force {
            print!(
                "Delete {} record(s) from '{}'? [y/N] ",
                matching.len(),
                self.collection
            );
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let removed = store
            .delete(&self.collection, |r, _, _| matches_all(r, filters))
            .await?;
        println!("Deleted {} record(s) from '{}'", removed, self.collection);
        Ok(())
    }
}

/// Reload collections from the spreadsheet
#[derive(Args)]
pub struct RefreshCommand {
    /// Collection to reload (all when omitted)
    pub collection: Option<String>,
}

impl RefreshCommand {
    pub async fn run<G: GridClient>(&self, store: &mut Store<G>) -> Result<(), Box<dyn Error>> {
        match &self.collection {
            Some(name) => {
                store.refresh_collection(name).await?;
                let rows = store.collection(name).map_or(0, |c| c.len());
                println!("Reloaded '{}': {} record(s)", name, rows);
            }
            None => {
                store.refresh_all().await?;
                for collection in store.registry().iter() {
                    println!("Reloaded '{}': {} record(s)", collection.name(), collection.len());
                }
            }
        }
        Ok(())
    }
}
