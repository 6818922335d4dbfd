//! Command adapter
//!
//! Maps each subcommand onto the lifecycle core: the resource registry
//! supplies the type's service/collection/scoping metadata, the scope
//! resolver decides what to touch, and the collector or batch executor
//! does the work through closures over the API client.

use crate::config::Config;
use crate::gcp::client::{extract_short_name, GcpClient};
use crate::ops::batch::{execute_batch, BatchOptions};
use crate::ops::collector::{collect, CollectMode};
use crate::ops::error::OpsError;
use crate::ops::poller::{poll_to_completion, OperationHandle, PollConfig};
use crate::ops::scope::{resolve_scopes, ResourceRef, Scope, ScopeKind};
use crate::output::{self, OutputFormat};
use crate::resource::{get_all_resource_keys, get_resource, ColumnDef, ResourceDef};
use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Arguments for `cloudctl list`.
#[derive(Debug, Args)]
pub struct ListCmd {
    /// Resource type to list (see `cloudctl resources`)
    pub resource_type: String,

    /// Zone to list; repeatable. Defaults to every zone.
    #[arg(long = "zone")]
    pub zones: Vec<String>,

    /// Region to list; repeatable. Defaults to every region.
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Server-side filter expression
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort results by name (case-insensitive)
    #[arg(long)]
    pub sorted: bool,

    /// Maximum number of items to print
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Keep going when individual scopes fail to list
    #[arg(long)]
    pub best_effort: bool,
}

/// Arguments for `cloudctl delete`.
#[derive(Debug, Args)]
pub struct DeleteCmd {
    /// Resource type to delete from (see `cloudctl resources`)
    pub resource_type: String,

    /// Names of the resources to delete
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Zone of the targets (zonal resources)
    #[arg(long)]
    pub zone: Option<String>,

    /// Region of the targets (regional resources)
    #[arg(long)]
    pub region: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,

    /// Seconds between operation polls
    #[arg(long, default_value_t = 3)]
    pub poll_interval: u64,

    /// Maximum seconds to wait for each operation
    #[arg(long, default_value_t = 240)]
    pub timeout: u64,

    /// Concurrent operations in flight
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Submit the deletes and exit without waiting for the operations
    #[arg(long = "async")]
    pub no_wait: bool,
}

/// A named operation plus the scope it lives in.
#[derive(Debug, Args)]
pub struct OperationRef {
    /// Operation name
    pub name: String,

    /// Zone the operation belongs to
    #[arg(long)]
    pub zone: Option<String>,

    /// Region the operation belongs to
    #[arg(long, conflicts_with = "zone")]
    pub region: Option<String>,
}

impl OperationRef {
    fn scope(&self) -> Scope {
        if let Some(zone) = &self.zone {
            return Scope::Zone(zone.clone());
        }
        if let Some(region) = &self.region {
            return Scope::Region(region.clone());
        }
        Scope::Global
    }
}

/// Arguments for `cloudctl operations wait`.
#[derive(Debug, Args)]
pub struct WaitCmd {
    #[command(flatten)]
    pub operation: OperationRef,

    /// Seconds between polls
    #[arg(long, default_value_t = 3)]
    pub poll_interval: u64,

    /// Maximum seconds to wait
    #[arg(long, default_value_t = 240)]
    pub timeout: u64,
}

fn lookup_resource(resource_type: &str) -> Result<&'static ResourceDef> {
    get_resource(resource_type).with_context(|| {
        format!(
            "unknown resource type \"{}\" (known: {})",
            resource_type,
            get_all_resource_keys().join(", ")
        )
    })
}

/// The scope names a list invocation asks for, validated against the
/// resource's scoping dimension. Empty means "all scopes of the kind".
fn requested_scopes(def: &ResourceDef, zones: &[String], regions: &[String]) -> Result<Vec<String>> {
    match def.scope_kind {
        ScopeKind::Zonal => {
            if !regions.is_empty() {
                bail!("{} are zonal; use --zone", def.display_name);
            }
            Ok(zones.to_vec())
        }
        ScopeKind::Regional => {
            if !zones.is_empty() {
                bail!("{} are regional; use --region", def.display_name);
            }
            Ok(regions.to_vec())
        }
        ScopeKind::Global => Ok(Vec::new()),
    }
}

/// `cloudctl list <resource-type>`
pub async fn run_list(client: &GcpClient, cmd: ListCmd, format: OutputFormat) -> Result<i32> {
    let def = lookup_resource(&cmd.resource_type)?;
    let requested = requested_scopes(def, &cmd.zones, &cmd.regions)?;

    let scope_set = resolve_scopes(def.scope_kind, &requested, || async {
        client.list_scope_names(def.scope_kind).await
    })
    .await?;

    let mode = if cmd.best_effort {
        CollectMode::BestEffort
    } else {
        CollectMode::Strict
    };

    let filter = cmd.filter.as_deref();
    let collected = collect(&scope_set, mode, |scope, token| async move {
        client
            .list_page(&def.service, &scope, &def.collection, filter, token.as_deref())
            .await
    })
    .await;

    let (mut items, warnings, failed) = match collected {
        Ok(out) => (out.items, out.warnings, false),
        // Strict-mode aggregate failure: gathered items are still shown,
        // the invocation still fails.
        Err(OpsError::Collect { failures, partial }) => {
            let warnings = failures
                .iter()
                .map(|f| format!("{}: {}", f.scope, f.cause))
                .collect();
            (partial, warnings, true)
        }
        Err(other) => return Err(other.into()),
    };

    for warning in &warnings {
        eprintln!("warning: listing {}", warning);
    }

    if cmd.sorted {
        output::sort_items_by(&mut items, &def.id_field);
    }
    if let Some(max) = cmd.max_results {
        items.truncate(max);
    }

    match format {
        OutputFormat::Table => print!("{}", output::render_table(&def.columns, &items)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
    }

    if failed {
        eprintln!("error: listing failed in {} scope(s)", warnings.len());
        return Ok(1);
    }
    Ok(0)
}

/// `cloudctl delete <resource-type> <name>...`
pub async fn run_delete(
    client: &GcpClient,
    cancel: &CancellationToken,
    cmd: DeleteCmd,
    config: &Config,
) -> Result<i32> {
    let def = lookup_resource(&cmd.resource_type)?;

    let scope_name = match def.scope_kind {
        ScopeKind::Zonal => {
            if cmd.region.is_some() {
                bail!("{} are zonal; use --zone", def.display_name);
            }
            Some(cmd.zone.clone().or_else(|| config.effective_zone()).context(
                "no zone given; pass --zone or configure a default zone",
            )?)
        }
        ScopeKind::Regional => {
            if cmd.zone.is_some() {
                bail!("{} are regional; use --region", def.display_name);
            }
            Some(
                cmd.region
                    .clone()
                    .or_else(|| config.effective_region())
                    .context("no region given; pass --region or configure a default region")?,
            )
        }
        ScopeKind::Global => None,
    };

    // One scope per batch; the resolver validates it exists before any
    // delete goes out.
    let requested: Vec<String> = scope_name.into_iter().collect();
    let scope_set = resolve_scopes(def.scope_kind, &requested, || async {
        client.list_scope_names(def.scope_kind).await
    })
    .await?;
    let scope = scope_set.scopes()[0].clone();

    if !cmd.force && !confirm_delete(def, &cmd.names, &scope)? {
        println!("Aborted.");
        return Ok(1);
    }

    let targets: Vec<ResourceRef> = cmd
        .names
        .iter()
        .map(|name| ResourceRef::new(&cmd.resource_type, name, scope.clone()))
        .collect();

    let opts = BatchOptions {
        concurrency: cmd.concurrency,
        poll: PollConfig {
            interval: Duration::from_secs(cmd.poll_interval),
            timeout: Duration::from_secs(cmd.timeout),
        },
        wait: !cmd.no_wait,
    };

    let result = execute_batch(
        targets,
        &opts,
        cancel,
        |target| async move { client.delete_resource(&target, &def.service, &def.collection).await },
        |handle| async move {
            client
                .get_operation(&def.service, &handle.scope, &handle.operation)
                .await
        },
    )
    .await;

    print!("{}", output::render_batch_summary(&result));
    Ok(if result.has_failures() { 1 } else { 0 })
}

fn confirm_delete(def: &ResourceDef, names: &[String], scope: &Scope) -> Result<bool> {
    print!(
        "Delete {} [{}] in {}? [y/N] ",
        def.display_name.to_lowercase(),
        names.join(", "),
        scope
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// `cloudctl zones` / `cloudctl regions`
pub async fn run_scope_listing(
    client: &GcpClient,
    collection: &str,
    format: OutputFormat,
) -> Result<i32> {
    let items = client.list_scope_details(collection).await?;

    let mut columns = vec![
        ColumnDef {
            header: "NAME".to_string(),
            json_path: "name".to_string(),
            width: 24,
        },
        ColumnDef {
            header: "STATUS".to_string(),
            json_path: "status".to_string(),
            width: 8,
        },
        ColumnDef {
            header: "DEPRECATED".to_string(),
            json_path: "deprecated.state".to_string(),
            width: 10,
        },
    ];
    if collection == "zones" {
        columns.insert(
            1,
            ColumnDef {
                header: "REGION".to_string(),
                json_path: "region".to_string(),
                width: 16,
            },
        );
    }

    match format {
        OutputFormat::Table => print!("{}", output::render_table(&columns, &items)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
    }
    Ok(0)
}

/// `cloudctl operations get <name>`
pub async fn run_operation_get(
    client: &GcpClient,
    op: OperationRef,
    format: OutputFormat,
) -> Result<i32> {
    let scope = op.scope();
    let data = client.get_operation("compute", &scope, &op.name).await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "name": data.name,
                "status": data.status.to_string(),
                "target": data.target_link,
                "error": data.error.as_ref().map(|e| json!({
                    "code": e.code,
                    "message": e.message,
                })),
            }))?
        ),
        OutputFormat::Table => {
            println!("name:    {}", data.name);
            println!("scope:   {}", scope);
            println!("status:  {}", data.status);
            if let Some(target) = &data.target_link {
                println!("target:  {}", extract_short_name(target));
            }
            if let Some(error) = &data.error {
                println!("error:   {}: {}", error.code, error.message);
            }
        }
    }
    Ok(0)
}

/// `cloudctl operations wait <name>`
pub async fn run_operation_wait(
    client: &GcpClient,
    cancel: &CancellationToken,
    cmd: WaitCmd,
) -> Result<i32> {
    let scope = cmd.operation.scope();
    let initial = client.get_operation("compute", &scope, &cmd.operation.name).await?;

    let target_name = initial
        .target_link
        .as_deref()
        .map(extract_short_name)
        .unwrap_or_else(|| "unknown".to_string());
    let handle = OperationHandle {
        operation: cmd.operation.name.clone(),
        scope: scope.clone(),
        target: ResourceRef::new("resources", &target_name, scope.clone()),
    };
    let config = PollConfig {
        interval: Duration::from_secs(cmd.poll_interval),
        timeout: Duration::from_secs(cmd.timeout),
    };

    match poll_to_completion(&handle, initial, config, cancel, |h| async move {
        client.get_operation("compute", &h.scope, &h.operation).await
    })
    .await
    {
        Ok(data) => {
            println!("operation {} {}", data.name, data.status);
            Ok(0)
        }
        Err(err) => {
            eprintln!("error: {}", err);
            Ok(1)
        }
    }
}

/// `cloudctl resources`
pub fn run_resources(format: OutputFormat) -> Result<i32> {
    let rows: Vec<serde_json::Value> = get_all_resource_keys()
        .iter()
        .map(|key| {
            let def = get_resource(key).expect("registry key vanished");
            json!({
                "type": key,
                "scope": kind_label(def.scope_kind),
                "description": def.display_name,
            })
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            let columns = vec![
                ColumnDef {
                    header: "TYPE".to_string(),
                    json_path: "type".to_string(),
                    width: 20,
                },
                ColumnDef {
                    header: "SCOPE".to_string(),
                    json_path: "scope".to_string(),
                    width: 8,
                },
                ColumnDef {
                    header: "DESCRIPTION".to_string(),
                    json_path: "description".to_string(),
                    width: 24,
                },
            ];
            print!("{}", output::render_table(&columns, &rows));
        }
    }
    Ok(0)
}

fn kind_label(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Zonal => "zonal",
        ScopeKind::Regional => "regional",
        ScopeKind::Global => "global",
    }
}
