#![allow(dead_code)]

use tubeline::{config::Config, testing::ScriptedFetch, Client};

pub fn client(fetch: ScriptedFetch) -> Client<ScriptedFetch> {
    client_with(Config::default(), fetch)
}

pub fn client_with(config: Config, fetch: ScriptedFetch) -> Client<ScriptedFetch> {
    Client::with_fetch(config, fetch).unwrap()
}
