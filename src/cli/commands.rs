//! CLI command definitions

use crate::domain::{
    ContentId, NormalizationId, NormalizationSource, RelationshipType, ReviewStatus, TagType,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taxon")]
#[command(about = "Tag taxonomy manager", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Tags are given by name (matched after normalization) or by numeric id
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new taxonomy
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// View or modify configuration
    Config {
        /// Config key to get or set
        key: Option<String>,

        /// Value to set (if provided, sets the key)
        value: Option<String>,

        /// List all configuration
        #[arg(short, long)]
        list: bool,
    },

    /// Show the canonical form of raw tag names
    Normalize {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Return the canonical tag for a name, creating it if needed
    Resolve {
        name: String,

        /// Tag type for a new tag (inferred when omitted)
        #[arg(short = 't', long = "type")]
        tag_type: Option<TagType>,

        #[arg(short, long)]
        description: Option<String>,

        /// Parent of a new tag; repeatable
        #[arg(short, long = "parent")]
        parents: Vec<String>,

        #[arg(long)]
        featured: bool,

        #[arg(long)]
        private: bool,

        /// Reuse a similar existing tag before creating
        #[arg(long)]
        fuzzy: bool,

        /// Similarity threshold for --fuzzy (default from config)
        #[arg(long, requires = "fuzzy")]
        threshold: Option<f64>,
    },

    /// Look up a tag without creating it
    Find {
        name: String,

        /// Fall back to the most similar tag
        #[arg(long)]
        similar: bool,

        /// Similarity threshold for --similar (default from config)
        #[arg(long, requires = "similar")]
        threshold: Option<f64>,
    },

    /// List all tags
    Tags,

    /// Show a tag with its parents, children and usage
    Show { tag: String },

    /// Manage hierarchy edges
    Edge {
        #[command(subcommand)]
        action: EdgeCommand,
    },

    /// List direct parents of a tag
    Parents { tag: String },

    /// List direct children of a tag
    Children { tag: String },

    /// List every ancestor of a tag
    Ancestors { tag: String },

    /// List every descendant of a tag
    Descendants { tag: String },

    /// Print the hierarchy below a tag, or below every root
    Tree { tag: Option<String> },

    /// Delete a tag that has no children
    Delete { tag: String },

    /// Merge LOSER into WINNER and delete LOSER
    Merge { loser: String, winner: String },

    /// Merge tags whose names differ only in case, spacing or punctuation
    Sweep,

    /// Manage content items
    Content {
        #[command(subcommand)]
        action: ContentCommand,
    },

    /// Review suggested normalizations
    Review {
        #[command(subcommand)]
        action: ReviewCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum EdgeCommand {
    /// Add PARENT -> CHILD
    Add {
        parent: String,
        child: String,

        #[arg(short, long, default_value_t = RelationshipType::ParentChild)]
        relationship: RelationshipType,
    },

    /// Remove PARENT -> CHILD
    Remove { parent: String, child: String },

    /// Report whether PARENT -> CHILD would create a cycle
    Check { parent: String, child: String },
}

#[derive(Subcommand, Debug)]
pub enum ContentCommand {
    /// Register a content item
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Free-form metadata, usually JSON
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Attach tags to a content item, creating them if needed
    Tag {
        content: ContentId,

        #[arg(required = true)]
        tags: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReviewCommand {
    /// Submit a suggested normalization
    Submit {
        /// Raw name as encountered
        name: String,

        /// Suggested canonical form (default: normalized NAME)
        #[arg(short, long)]
        normalized: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, default_value_t = 0.5)]
        confidence: f64,

        #[arg(short, long, default_value_t = NormalizationSource::UserSubmitted)]
        source: NormalizationSource,

        /// Suggested parent tag; repeatable
        #[arg(short, long = "parent")]
        parents: Vec<String>,
    },

    /// List normalizations
    List {
        #[arg(short, long)]
        status: Option<ReviewStatus>,
    },

    /// Approve one or more normalizations
    Approve {
        #[arg(required = true)]
        ids: Vec<NormalizationId>,

        #[arg(short, long)]
        reviewer: String,

        /// Resolve to this existing tag instead of the candidate name
        #[arg(long, conflicts_with = "new_name")]
        tag: Option<String>,

        /// Resolve to a new tag with this name
        #[arg(long)]
        new_name: Option<String>,

        /// Tag type for --new-name
        #[arg(short = 't', long = "type", requires = "new_name")]
        tag_type: Option<TagType>,
    },

    /// Reject one or more normalizations
    Reject {
        #[arg(required = true)]
        ids: Vec<NormalizationId>,

        #[arg(short, long)]
        reviewer: String,

        #[arg(short, long)]
        notes: Option<String>,
    },
}
