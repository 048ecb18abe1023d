//! Python node tables and declaration query.

use phf::phf_map;

use crate::parser::NodeKind;

/// Tree-sitter query naming functions and classes.
///
/// Captures:
/// - `function` / `class`: the definition node
/// - `name`: its identifier
pub(super) const DECLARATION_QUERY: &str = r#"
(function_definition
  name: (identifier) @name
) @function

(class_definition
  name: (identifier) @name
) @class
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "module" => NodeKind::Module,
    "function_definition" => NodeKind::Function,
    "lambda" => NodeKind::Lambda,
    "class_definition" => NodeKind::Class,
    "parameters" => NodeKind::Parameters,
    "lambda_parameters" => NodeKind::Parameters,
    "default_parameter" => NodeKind::Parameter,
    "typed_parameter" => NodeKind::Parameter,
    "typed_default_parameter" => NodeKind::Parameter,
    "block" => NodeKind::Block,
    "if_statement" => NodeKind::If,
    "elif_clause" => NodeKind::If,
    "conditional_expression" => NodeKind::If,
    "while_statement" => NodeKind::While,
    "for_statement" => NodeKind::ForEach,
    "for_in_clause" => NodeKind::ForEach,
    "try_statement" => NodeKind::Try,
    "except_clause" => NodeKind::Catch,
    "finally_clause" => NodeKind::Finally,
    "with_statement" => NodeKind::With,
    "call" => NodeKind::Call,
    "assignment" => NodeKind::Assignment,
    "augmented_assignment" => NodeKind::AugmentedAssignment,
    "global_statement" => NodeKind::GlobalDecl,
    "nonlocal_statement" => NodeKind::GlobalDecl,
    "subscript" => NodeKind::Subscript,
    "binary_operator" => NodeKind::Binary,
    "comparison_operator" => NodeKind::Binary,
    "boolean_operator" => NodeKind::Binary,
    "unary_operator" => NodeKind::Unary,
    "not_operator" => NodeKind::Unary,
    "assert_statement" => NodeKind::Assert,
    "return_statement" => NodeKind::Return,
    "import_statement" => NodeKind::Import,
    "import_from_statement" => NodeKind::Import,
    "future_import_statement" => NodeKind::Import,
    "attribute" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "integer" => NodeKind::Number,
    "float" => NodeKind::Number,
    "string" => NodeKind::String,
    "concatenated_string" => NodeKind::String,
    "true" => NodeKind::Boolean,
    "false" => NodeKind::Boolean,
    "none" => NodeKind::Boolean,
    "list" => NodeKind::Collection,
    "dictionary" => NodeKind::Collection,
    "set" => NodeKind::Collection,
    "tuple" => NodeKind::Collection,
    "expression_statement" => NodeKind::ExprStatement,
    "comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}
