//! JavaScript node tables and declaration query.

use phf::phf_map;

use crate::parser::NodeKind;

pub(super) const DECLARATION_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name
) @function

(generator_function_declaration
  name: (identifier) @name
) @function

(method_definition
  name: (property_identifier) @name
) @function

(variable_declarator
  name: (identifier) @name
  value: [(arrow_function) (function_expression)] @function
)

(class_declaration
  name: (identifier) @name
) @class
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "program" => NodeKind::Module,
    "function_declaration" => NodeKind::Function,
    "generator_function_declaration" => NodeKind::Function,
    "method_definition" => NodeKind::Function,
    "arrow_function" => NodeKind::Lambda,
    "function_expression" => NodeKind::Lambda,
    "generator_function" => NodeKind::Lambda,
    "class_declaration" => NodeKind::Class,
    "class" => NodeKind::Class,
    "formal_parameters" => NodeKind::Parameters,
    "assignment_pattern" => NodeKind::Parameter,
    "rest_pattern" => NodeKind::Parameter,
    "statement_block" => NodeKind::Block,
    "if_statement" => NodeKind::If,
    "ternary_expression" => NodeKind::If,
    "while_statement" => NodeKind::While,
    "do_statement" => NodeKind::While,
    "for_statement" => NodeKind::For,
    "for_in_statement" => NodeKind::ForEach,
    "try_statement" => NodeKind::Try,
    "catch_clause" => NodeKind::Catch,
    "finally_clause" => NodeKind::Finally,
    "call_expression" => NodeKind::Call,
    "new_expression" => NodeKind::Call,
    "assignment_expression" => NodeKind::Assignment,
    "augmented_assignment_expression" => NodeKind::AugmentedAssignment,
    "variable_declarator" => NodeKind::Declaration,
    "subscript_expression" => NodeKind::Subscript,
    "update_expression" => NodeKind::Update,
    "binary_expression" => NodeKind::Binary,
    "unary_expression" => NodeKind::Unary,
    "return_statement" => NodeKind::Return,
    "import_statement" => NodeKind::Import,
    "member_expression" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "this" => NodeKind::Identifier,
    "property_identifier" => NodeKind::Property,
    "shorthand_property_identifier" => NodeKind::Property,
    "number" => NodeKind::Number,
    "string" => NodeKind::String,
    "template_string" => NodeKind::String,
    "true" => NodeKind::Boolean,
    "false" => NodeKind::Boolean,
    "null" => NodeKind::Boolean,
    "undefined" => NodeKind::Boolean,
    "array" => NodeKind::Collection,
    "object" => NodeKind::Collection,
    "expression_statement" => NodeKind::ExprStatement,
    "comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_javascript::LANGUAGE.into()
}
