// src/fetch/urls.rs
use anyhow::{Context, Result};
use url::Url;

use crate::config::CensusConfig;
use crate::process::raw_table::{DISTRICT_COLUMN, NAME_COLUMN, STATE_COLUMN};
use crate::schema::RecodeSpec;

/// Every raw variable the recode tables read, sorted.
pub fn required_variables(spec: &RecodeSpec) -> Vec<String> {
    spec.raw_fields().into_iter().map(str::to_string).collect()
}

/// Split `vars` into request-sized chunks of at most `max` variables.
pub fn chunk_variables(vars: &[String], max: usize) -> Vec<Vec<String>> {
    vars.chunks(max.max(1)).map(|c| c.to_vec()).collect()
}

/// `{base}/{year}/{dataset}?get=NAME,<vars>&for=congressional district:*&in=state:*[&key=..]`
pub fn build_query_url(config: &CensusConfig, year: u16, vars: &[String]) -> Result<Url> {
    let base = format!(
        "{}/{}/{}",
        config.base_url.trim_end_matches('/'),
        year,
        config.dataset.trim_matches('/')
    );
    let mut url = Url::parse(&base).with_context(|| format!("parsing API URL {}", base))?;

    let mut get = String::from(NAME_COLUMN);
    for v in vars {
        get.push(',');
        get.push_str(v);
    }
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("get", &get)
            .append_pair("for", &format!("{}:*", DISTRICT_COLUMN))
            .append_pair("in", &format!("{}:*", STATE_COLUMN));
        if let Some(key) = &config.api_key {
            q.append_pair("key", key);
        }
    }
    Ok(url)
}
