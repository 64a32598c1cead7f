//! Template mini-language
//!
//! Card content may embed `{{...}}` directives:
//!
//! - `{{setvar::NAME::VALUE}}` / `{{getvar::NAME}}` - session variables
//! - `{{random::a::b}}` / `{{random:a,b}}` - uniform random choice
//! - `{{roll:XdY}}` - sum of X dice with Y sides

mod resolver;
mod vars;

pub use resolver::{
    DEFAULT_MAX_DICE, Resolver, ResolverOptions, TemplateResolver, collapse_blank_lines, pick_random_csv,
    pick_random_list, record_setvars, roll_dice, strip_setvars, substitute_getvars, unescape_braces,
};
pub use vars::VariableTable;
