//! Rust node tables and declaration query.

use phf::phf_map;

use crate::parser::NodeKind;

/// Captures `function` items and `class`-like containers (impl blocks keyed
/// by their self type, traits).
pub(super) const DECLARATION_QUERY: &str = r#"
(function_item
  name: (identifier) @name
) @function

(impl_item
  type: (_) @name
) @class

(trait_item
  name: (type_identifier) @name
) @class
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "source_file" => NodeKind::Module,
    "function_item" => NodeKind::Function,
    "closure_expression" => NodeKind::Lambda,
    "impl_item" => NodeKind::Class,
    "trait_item" => NodeKind::Class,
    "parameters" => NodeKind::Parameters,
    "closure_parameters" => NodeKind::Parameters,
    "parameter" => NodeKind::Parameter,
    "block" => NodeKind::Block,
    "if_expression" => NodeKind::If,
    "while_expression" => NodeKind::While,
    "loop_expression" => NodeKind::While,
    "for_expression" => NodeKind::ForEach,
    "call_expression" => NodeKind::Call,
    "macro_invocation" => NodeKind::Call,
    "assignment_expression" => NodeKind::Assignment,
    "compound_assignment_expr" => NodeKind::AugmentedAssignment,
    "let_declaration" => NodeKind::Declaration,
    "const_item" => NodeKind::ConstDecl,
    "static_item" => NodeKind::StaticDecl,
    "index_expression" => NodeKind::Subscript,
    "binary_expression" => NodeKind::Binary,
    "unary_expression" => NodeKind::Unary,
    "return_expression" => NodeKind::Return,
    "use_declaration" => NodeKind::Import,
    "extern_crate_declaration" => NodeKind::Import,
    "field_expression" => NodeKind::Member,
    "scoped_identifier" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "self" => NodeKind::Identifier,
    "field_identifier" => NodeKind::Property,
    "integer_literal" => NodeKind::Number,
    "float_literal" => NodeKind::Number,
    "string_literal" => NodeKind::String,
    "raw_string_literal" => NodeKind::String,
    "char_literal" => NodeKind::String,
    "boolean_literal" => NodeKind::Boolean,
    "array_expression" => NodeKind::Collection,
    "expression_statement" => NodeKind::ExprStatement,
    "line_comment" => NodeKind::Comment,
    "block_comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_rust::LANGUAGE.into()
}
