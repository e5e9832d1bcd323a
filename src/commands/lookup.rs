use anyhow::{Context, Result};

use masothue::client::Client;
use masothue::config::Config;
use masothue::format::{format_company_details, format_hits};
use masothue::models::CompanyRecord;

use super::user_error;

pub async fn search(config: &Config, query: &str, json: bool) -> Result<()> {
    let client = Client::from_config(config).map_err(user_error)?;
    let hits = client.search(query).await.map_err(user_error)?;

    // A single hit is resolved straight to its record
    if let [hit] = hits.as_slice() {
        if let Some(reference) = &hit.reference {
            let record = client.get_details(reference).await.map_err(user_error)?;
            return print_record(&record, json);
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&hits).context("Failed to serialize hits")?
        );
    } else {
        print!("{}", format_hits(query, &hits));
    }
    Ok(())
}

pub async fn detail(config: &Config, reference: &str, json: bool) -> Result<()> {
    let client = Client::from_config(config).map_err(user_error)?;
    let record = client.get_details(reference).await.map_err(user_error)?;
    print_record(&record, json)
}

pub async fn lookup(config: &Config, query: &str, json: bool) -> Result<()> {
    let client = Client::from_config(config).map_err(user_error)?;

    match client.lookup(query).await.map_err(user_error)? {
        Some(record) => print_record(&record, json),
        None if json => {
            println!("null");
            Ok(())
        }
        None => {
            print!("{}", format_hits(query, &[]));
            Ok(())
        }
    }
}

fn print_record(record: &CompanyRecord, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(record).context("Failed to serialize record")?
        );
    } else {
        print!("{}", format_company_details(record));
    }
    Ok(())
}
