//! Java node tables and declaration query.

use phf::phf_map;

use crate::parser::NodeKind;

pub(super) const DECLARATION_QUERY: &str = r#"
(method_declaration
  name: (identifier) @name
) @function

(constructor_declaration
  name: (identifier) @name
) @function

(class_declaration
  name: (identifier) @name
) @class

(interface_declaration
  name: (identifier) @name
) @class

(enum_declaration
  name: (identifier) @name
) @class
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "program" => NodeKind::Module,
    "method_declaration" => NodeKind::Function,
    "constructor_declaration" => NodeKind::Function,
    "lambda_expression" => NodeKind::Lambda,
    "class_declaration" => NodeKind::Class,
    "interface_declaration" => NodeKind::Class,
    "enum_declaration" => NodeKind::Class,
    "record_declaration" => NodeKind::Class,
    "formal_parameters" => NodeKind::Parameters,
    "formal_parameter" => NodeKind::Parameter,
    "spread_parameter" => NodeKind::Parameter,
    "block" => NodeKind::Block,
    "constructor_body" => NodeKind::Block,
    "if_statement" => NodeKind::If,
    "ternary_expression" => NodeKind::If,
    "while_statement" => NodeKind::While,
    "do_statement" => NodeKind::While,
    "for_statement" => NodeKind::For,
    "enhanced_for_statement" => NodeKind::ForEach,
    "try_statement" => NodeKind::Try,
    "try_with_resources_statement" => NodeKind::Try,
    "catch_clause" => NodeKind::Catch,
    "finally_clause" => NodeKind::Finally,
    "method_invocation" => NodeKind::Call,
    "object_creation_expression" => NodeKind::Call,
    "array_creation_expression" => NodeKind::Call,
    "assignment_expression" => NodeKind::Assignment,
    "variable_declarator" => NodeKind::Declaration,
    "array_access" => NodeKind::Subscript,
    "update_expression" => NodeKind::Update,
    "binary_expression" => NodeKind::Binary,
    "unary_expression" => NodeKind::Unary,
    "assert_statement" => NodeKind::Assert,
    "return_statement" => NodeKind::Return,
    "import_declaration" => NodeKind::Import,
    "field_access" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "this" => NodeKind::Identifier,
    "decimal_integer_literal" => NodeKind::Number,
    "hex_integer_literal" => NodeKind::Number,
    "octal_integer_literal" => NodeKind::Number,
    "binary_integer_literal" => NodeKind::Number,
    "decimal_floating_point_literal" => NodeKind::Number,
    "hex_floating_point_literal" => NodeKind::Number,
    "string_literal" => NodeKind::String,
    "character_literal" => NodeKind::String,
    "true" => NodeKind::Boolean,
    "false" => NodeKind::Boolean,
    "null_literal" => NodeKind::Boolean,
    "array_initializer" => NodeKind::Collection,
    "instanceof_expression" => NodeKind::TypeCheck,
    "expression_statement" => NodeKind::ExprStatement,
    "line_comment" => NodeKind::Comment,
    "block_comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_java::LANGUAGE.into()
}
