//! Config serialization to TOML
//!
//! Single source of truth for config file format. Used by `config --show`
//! and `config --init`. The basic-auth password is never written out.

use super::{AuthMethod, Config};

impl Config {
    /// Render the effective configuration as a TOML document
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# a2o configuration\n");
        output.push_str("# Precedence: environment variables > this file > built-in defaults\n\n");
        output.push_str(&format!("bind_addr = {:?}\n", self.bind_addr.to_string()));

        output.push_str(&self.auth_to_toml());
        output.push_str(&self.upstream_to_toml());
        output.push_str(&self.logging_to_toml());
        output.push_str(&self.routing_to_toml());
        output
    }

    fn auth_to_toml(&self) -> String {
        let auth = &self.auth;
        let mut output = String::from("\n[auth]\n");
        output.push_str("# Prefer BASIC_AUTH_USER / BASIC_AUTH_PASS environment variables\n");
        match &auth.basic_user {
            Some(user) => output.push_str(&format!("basic_user = {:?}\n", user)),
            None => output.push_str("# basic_user = \"proxy\"\n"),
        }
        output.push_str("# basic_pass = \"...\"\n");
        output.push_str(&format!("public_paths = {:?}\n", auth.public_paths));
        output.push_str(&format!(
            "allow_unauthenticated = {}\n",
            auth.allow_unauthenticated
        ));
        output
    }

    fn upstream_to_toml(&self) -> String {
        let upstream = &self.upstream;
        format!(
            "\n[upstream]\ntimeout_secs = {}\nconnect_timeout_secs = {}\npool_max_idle_per_host = {}\n",
            upstream.timeout_secs, upstream.connect_timeout_secs, upstream.pool_max_idle_per_host
        )
    }

    fn logging_to_toml(&self) -> String {
        let logging = &self.logging;
        let mut output = String::from("\n[logging]\n");
        output.push_str(&format!("level = {:?}\n", logging.level));
        output.push_str(&format!("format = {:?}\n", logging.format.as_str()));
        output.push_str(&format!("file_enabled = {}\n", logging.file_enabled));
        output.push_str(&format!(
            "file_dir = {:?}\n",
            logging.file_dir.display().to_string()
        ));
        output.push_str(&format!(
            "file_rotation = {:?}\n",
            logging.file_rotation.as_str()
        ));
        output.push_str(&format!("file_prefix = {:?}\n", logging.file_prefix));
        output
    }

    /// Serialize routing tables; models and providers are sorted for
    /// deterministic output
    fn routing_to_toml(&self) -> String {
        let routing = &self.routing;
        let mut output = String::from("\n[routing]\n");
        output.push_str(&format!(
            "default_provider = {:?}\n",
            routing.default_provider
        ));
        output.push_str(&format!("endpoint_header = {:?}\n", routing.endpoint_header));
        output.push_str(&format!(
            "endpoint_allow_pattern = {:?}\n",
            routing.endpoint_allow_pattern
        ));

        output.push_str("\n[routing.models]\n");
        let mut models: Vec<_> = routing.models.iter().collect();
        models.sort();
        for (model, provider) in models {
            output.push_str(&format!("{:?} = {:?}\n", model, provider));
        }

        for (id, provider) in &routing.providers {
            output.push_str(&format!("\n[routing.providers.{:?}]\n", id));
            output.push_str(&format!("base_url = {:?}\n", provider.base_url));
            if provider.auth.method != AuthMethod::Bearer {
                output.push_str(&format!("auth.method = {:?}\n", provider.auth.method.as_str()));
                if let Some(name) = &provider.auth.header_name {
                    output.push_str(&format!("auth.header_name = {:?}\n", name));
                }
            }
        }

        output
    }
}
