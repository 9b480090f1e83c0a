use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;
use taxon::application::{
    init, ApprovalTarget, ConfigService, NewTagFields, NewTagOptions, Registry, Taxonomy,
};
use taxon::cli::output;
use taxon::cli::{Cli, Commands, ContentCommand, EdgeCommand, ReviewCommand};
use taxon::domain::normalizer::{normalize, validate_name};
use taxon::domain::{NormalizationSubmission, Tag, TagId};
use taxon::error::{Result, TaxonError};
use taxon::infrastructure::config::{CONFIG_KEYS, LOG_ENV};
use taxon::infrastructure::Workspace;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e.display_with_suggestions());
            std::process::exit(e.exit_code());
        }
    }
}

/// TAXON_LOG wins; otherwise the workspace's `logging.level`, else warn
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = Workspace::discover()
            .and_then(|workspace| workspace.load_config())
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "warn".to_string());
        EnvFilter::new(level)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn open() -> Result<Taxonomy> {
    Taxonomy::open(&Workspace::discover()?)
}

/// Tag given by name, or by numeric id when no tag has that name
fn lookup_tag(registry: &Registry, reference: &str) -> Result<Tag> {
    if let Some(tag) = registry.find(reference)? {
        return Ok(tag);
    }
    match reference.trim().trim_start_matches('#').parse::<i64>() {
        Ok(id) => registry.get(TagId(id)),
        Err(_) => Err(TaxonError::tag_not_found(reference)),
    }
}

fn lookup_tags(registry: &Registry, references: &[String]) -> Result<Vec<TagId>> {
    references
        .iter()
        .map(|reference| lookup_tag(registry, reference).map(|tag| tag.id))
        .collect()
}

fn load_tags(registry: &Registry, ids: BTreeSet<TagId>) -> Result<Vec<Tag>> {
    ids.into_iter().map(|id| registry.get(id)).collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `value` as JSON or through its text formatter
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        print_json(value)
    } else {
        print!("{}", text(value));
        Ok(())
    }
}

fn with_newline(text: String) -> String {
    if text.ends_with('\n') {
        text
    } else {
        text + "\n"
    }
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Init { path } => {
            let (workspace, config) = init::init(&path)?;
            println!("Initialized taxon taxonomy at {}", workspace.root().display());
            println!(
                "Database: {}",
                workspace.database_path(&config).display()
            );
            Ok(())
        }
        Commands::Config { key, value, list } => {
            let service = ConfigService::new(Workspace::discover()?);

            if list {
                for (key, value) in service.list()? {
                    println!("{} = {}", key, value);
                }
                Ok(())
            } else if let Some(k) = key {
                if let Some(v) = value {
                    service.set(&k, &v)?;
                    println!("Set {} = {}", k, v);
                } else {
                    println!("{}", service.get(&k)?);
                }
                Ok(())
            } else {
                println!("Usage: taxon config [--list | <key> [<value>]]");
                println!("Valid keys: {}", CONFIG_KEYS.join(", "));
                Ok(())
            }
        }
        Commands::Normalize { names } => {
            for name in &names {
                validate_name(name)?;
            }
            let normalized: Vec<String> = names.iter().map(|name| normalize(name)).collect();
            emit(json, &normalized, |names| {
                names.iter().map(|name| format!("{}\n", name)).collect()
            })
        }
        Commands::Resolve {
            name,
            tag_type,
            description,
            parents,
            featured,
            private,
            fuzzy,
            threshold,
        } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let options = NewTagOptions {
                tag_type,
                description,
                is_featured: featured,
                is_private: private,
                parents: lookup_tags(&registry, &parents)?,
                ..Default::default()
            };

            let resolution = if fuzzy {
                registry.resolve_or_create_fuzzy(&name, threshold, &options)?
            } else {
                registry.resolve_or_create_with(&name, &options)?
            };
            emit(json, &resolution, |resolution| {
                let status = match (resolution.created, resolution.similarity) {
                    (true, _) => "created".to_string(),
                    (false, Some(score)) => format!("similar {:.2}", score),
                    (false, None) => "existing".to_string(),
                };
                format!("{} [{}]\n", output::format_tag(&resolution.tag), status)
            })
        }
        Commands::Find {
            name,
            similar,
            threshold,
        } => {
            let registry = open()?.registry();
            let found = match registry.find(&name)? {
                Some(tag) => Some(tag),
                None if similar => {
                    let threshold = threshold.unwrap_or(registry.fuzzy_threshold());
                    registry.find_similar(&name, threshold)?.map(|(tag, _)| tag)
                }
                None => None,
            };
            match found {
                Some(tag) => emit(json, &tag, |tag| with_newline(output::format_tag(tag))),
                None => Err(TaxonError::tag_not_found(name)),
            }
        }
        Commands::Tags => {
            let tags = open()?.registry().list()?;
            emit(json, &tags, |tags| with_newline(output::format_tag_list(tags)))
        }
        Commands::Show { tag } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let graph = taxonomy.hierarchy();
            let tag = lookup_tag(&registry, &tag)?;
            let parents = load_tags(&registry, graph.get_parents(tag.id)?)?;
            let children = load_tags(&registry, graph.get_children(tag.id)?)?;
            let content = registry.content_count(tag.id)?;

            if json {
                print_json(&serde_json::json!({
                    "tag": tag,
                    "parents": parents,
                    "children": children,
                    "content_count": content,
                }))
            } else {
                print!(
                    "{}",
                    output::format_tag_details(&tag, &parents, &children, content)
                );
                Ok(())
            }
        }
        Commands::Edge { action } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let graph = taxonomy.hierarchy();
            match action {
                EdgeCommand::Add {
                    parent,
                    child,
                    relationship,
                } => {
                    let parent = lookup_tag(&registry, &parent)?;
                    let child = lookup_tag(&registry, &child)?;
                    if graph.add_edge(parent.id, child.id, relationship)? {
                        println!("Added {} -> {}", parent.name, child.name);
                    } else {
                        println!("Edge {} -> {} already exists", parent.name, child.name);
                    }
                    Ok(())
                }
                EdgeCommand::Remove { parent, child } => {
                    let parent = lookup_tag(&registry, &parent)?;
                    let child = lookup_tag(&registry, &child)?;
                    if graph.remove_edge(parent.id, child.id)? {
                        println!("Removed {} -> {}", parent.name, child.name);
                    } else {
                        println!("No edge {} -> {}", parent.name, child.name);
                    }
                    Ok(())
                }
                EdgeCommand::Check { parent, child } => {
                    let parent = lookup_tag(&registry, &parent)?;
                    let child = lookup_tag(&registry, &child)?;
                    let path = graph.cycle_path(parent.id, child.id)?;
                    if json {
                        return print_json(&serde_json::json!({
                            "would_create_cycle": path.is_some(),
                            "path": path,
                        }));
                    }
                    match path {
                        Some(path) => {
                            let rendered = path
                                .iter()
                                .map(|id| registry.get(*id).map(|tag| tag.name))
                                .collect::<Result<Vec<_>>>()?;
                            println!("Would create a cycle: {}", rendered.join(" -> "));
                        }
                        None => println!(
                            "OK: {} -> {} keeps the taxonomy acyclic",
                            parent.name, child.name
                        ),
                    }
                    Ok(())
                }
            }
        }
        Commands::Parents { tag } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let tag = lookup_tag(&registry, &tag)?;
            let tags = load_tags(&registry, taxonomy.hierarchy().get_parents(tag.id)?)?;
            emit(json, &tags, |tags| with_newline(output::format_tag_list(tags)))
        }
        Commands::Children { tag } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let tag = lookup_tag(&registry, &tag)?;
            let tags = load_tags(&registry, taxonomy.hierarchy().get_children(tag.id)?)?;
            emit(json, &tags, |tags| with_newline(output::format_tag_list(tags)))
        }
        Commands::Ancestors { tag } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let tag = lookup_tag(&registry, &tag)?;
            let tags = load_tags(&registry, taxonomy.hierarchy().get_all_ancestors(tag.id)?)?;
            emit(json, &tags, |tags| with_newline(output::format_tag_list(tags)))
        }
        Commands::Descendants { tag } => {
            let taxonomy = open()?;
            let registry = taxonomy.registry();
            let tag = lookup_tag(&registry, &tag)?;
            let tags = load_tags(&registry, taxonomy.hierarchy().get_all_descendants(tag.id)?)?;
            emit(json, &tags, |tags| with_newline(output::format_tag_list(tags)))
        }
        Commands::Tree { tag } => {
            let taxonomy = open()?;
            let graph = taxonomy.hierarchy();
            let starts = match tag {
                Some(tag) => vec![lookup_tag(&taxonomy.registry(), &tag)?],
                None => graph.roots()?,
            };
            let mut lines = Vec::new();
            for start in starts {
                lines.extend(graph.subtree(start.id)?);
            }
            emit(json, &lines, |lines| with_newline(output::format_tree(lines)))
        }
        Commands::Delete { tag } => {
            let taxonomy = open()?;
            let tag = lookup_tag(&taxonomy.registry(), &tag)?;
            let deleted = taxonomy.hierarchy().delete_tag(tag.id)?;
            println!("Deleted {}", deleted.name);
            Ok(())
        }
        Commands::Merge { loser, winner } => {
            let registry = open()?.registry();
            let loser = lookup_tag(&registry, &loser)?;
            let winner = lookup_tag(&registry, &winner)?;
            let report = registry.merge(loser.id, winner.id)?;
            emit(json, &report, output::format_merge_report)
        }
        Commands::Sweep => {
            let report = open()?.registry().sweep_duplicates()?;
            emit(json, &report, output::format_sweep_report)
        }
        Commands::Content { action } => {
            let taxonomy = open()?;
            match action {
                ContentCommand::Add {
                    title,
                    description,
                    metadata,
                } => {
                    let item = taxonomy.add_content(
                        &title,
                        description.as_deref(),
                        metadata.as_deref(),
                    )?;
                    emit(json, &item, |item| with_newline(output::format_content(item)))
                }
                ContentCommand::Tag { content, tags } => {
                    let registry = taxonomy.registry();
                    let mut attached = Vec::new();
                    for name in &tags {
                        let tag = registry.resolve_or_create(name)?;
                        taxonomy.tag_content(content, tag.id)?;
                        attached.push(tag);
                    }
                    emit(json, &attached, |tags| {
                        format!(
                            "Tagged content #{} with {}\n",
                            content,
                            tags.iter()
                                .map(|tag| tag.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        )
                    })
                }
            }
        }
        Commands::Review { action } => {
            let taxonomy = open()?;
            let review = taxonomy.review();
            match action {
                ReviewCommand::Submit {
                    name,
                    normalized,
                    description,
                    confidence,
                    source,
                    parents,
                } => {
                    let submission = NormalizationSubmission {
                        original_name: name,
                        normalized_name: normalized,
                        description,
                        source,
                        confidence_score: confidence,
                        parent_candidate_ids: lookup_tags(&taxonomy.registry(), &parents)?,
                    };
                    let record = review.submit(submission)?;
                    emit(json, &record, |record| {
                        with_newline(output::format_normalization(record))
                    })
                }
                ReviewCommand::List { status } => {
                    let records = review.list(status)?;
                    emit(json, &records, |records| {
                        with_newline(output::format_normalization_list(records))
                    })
                }
                ReviewCommand::Approve {
                    ids,
                    reviewer,
                    tag,
                    new_name,
                    tag_type,
                } => {
                    let target = match (tag, new_name) {
                        (Some(tag), _) => {
                            ApprovalTarget::Existing(lookup_tag(&taxonomy.registry(), &tag)?.id)
                        }
                        (None, Some(name)) => ApprovalTarget::New(NewTagFields {
                            name,
                            tag_type,
                            ..Default::default()
                        }),
                        (None, None) => ApprovalTarget::Candidate,
                    };

                    if let [id] = ids.as_slice() {
                        let record = review.approve(*id, &reviewer, target)?;
                        return emit(json, &record, |record| {
                            with_newline(output::format_normalization(record))
                        });
                    }
                    if target != ApprovalTarget::Candidate {
                        return Err(TaxonError::Validation(
                            "--tag and --new-name apply to a single normalization".to_string(),
                        ));
                    }
                    let report = review.bulk_approve(&ids, &reviewer);
                    emit(json, &report, output::format_bulk_report)?;
                    bulk_outcome(report.failed.len())
                }
                ReviewCommand::Reject {
                    ids,
                    reviewer,
                    notes,
                } => {
                    if let [id] = ids.as_slice() {
                        let record = review.reject(*id, &reviewer, notes.as_deref())?;
                        return emit(json, &record, |record| {
                            with_newline(output::format_normalization(record))
                        });
                    }
                    let report = review.bulk_reject(&ids, &reviewer, notes.as_deref());
                    emit(json, &report, output::format_bulk_report)?;
                    bulk_outcome(report.failed.len())
                }
            }
        }
    }
}

fn bulk_outcome(failed: usize) -> Result<()> {
    if failed > 0 {
        return Err(TaxonError::Validation(format!(
            "{} normalization(s) could not be processed",
            failed
        )));
    }
    Ok(())
}
