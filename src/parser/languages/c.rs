//! C node tables and declaration query.
//!
//! Function names behind pointer or nested declarators are resolved from
//! the declarator chain during conversion.

use phf::phf_map;

use crate::parser::NodeKind;

pub(super) const DECLARATION_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name
  )
) @function
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "translation_unit" => NodeKind::Module,
    "function_definition" => NodeKind::Function,
    "parameter_list" => NodeKind::Parameters,
    "parameter_declaration" => NodeKind::Parameter,
    "compound_statement" => NodeKind::Block,
    "if_statement" => NodeKind::If,
    "conditional_expression" => NodeKind::If,
    "while_statement" => NodeKind::While,
    "do_statement" => NodeKind::While,
    "for_statement" => NodeKind::For,
    "call_expression" => NodeKind::Call,
    "assignment_expression" => NodeKind::Assignment,
    "declaration" => NodeKind::Declaration,
    "init_declarator" => NodeKind::Declaration,
    "preproc_def" => NodeKind::ConstDecl,
    "enumerator" => NodeKind::ConstDecl,
    "subscript_expression" => NodeKind::Subscript,
    "update_expression" => NodeKind::Update,
    "binary_expression" => NodeKind::Binary,
    "unary_expression" => NodeKind::Unary,
    "pointer_expression" => NodeKind::Unary,
    "return_statement" => NodeKind::Return,
    "preproc_include" => NodeKind::Import,
    "field_expression" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "field_identifier" => NodeKind::Property,
    "number_literal" => NodeKind::Number,
    "string_literal" => NodeKind::String,
    "char_literal" => NodeKind::String,
    "true" => NodeKind::Boolean,
    "false" => NodeKind::Boolean,
    "null" => NodeKind::Boolean,
    "initializer_list" => NodeKind::Collection,
    "expression_statement" => NodeKind::ExprStatement,
    "comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_c::LANGUAGE.into()
}
