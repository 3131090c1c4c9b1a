//! Migration summarization: schema operations and the destructive subset.

use tree_sitter::Node;

use super::{call_args, start_line, string_value, strings_of, text};
use crate::types::{DestructiveKind, DestructiveOp, Migration, MigrationOp};

#[derive(Default)]
struct Tally {
    creates: u32,
    alters: u32,
    table_drops: u32,
    renames: u32,
    table_name: Option<String>,
    destructive: Vec<DestructiveOp>,
}

pub(crate) fn extract_migration(root: Node<'_>, src: &str, file: &str) -> Migration {
    let mut tally = Tally::default();
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        match n.kind() {
            "scoped_call_expression" => scoped_call(n, src, &mut tally),
            "member_call_expression" => member_call(n, src, &mut tally),
            _ => {}
        }
        let mut cur = n.walk();
        for c in n.named_children(&mut cur) {
            stack.push(c);
        }
    }

    // Classification: a table drop dominates; an explicit create comes
    // next; renames alone classify as rename; everything else alters.
    let operation = if tally.table_drops > 0 {
        MigrationOp::Drop
    } else if tally.creates > 0 {
        MigrationOp::Create
    } else if tally.renames > 0
        && tally.alters == 0
        && tally.destructive.iter().all(|d| {
            matches!(
                d.op,
                DestructiveKind::RenameTable | DestructiveKind::RenameColumn
            )
        })
    {
        MigrationOp::Rename
    } else {
        MigrationOp::Alter
    };

    Migration {
        file_path: file.to_string(),
        table_name: tally.table_name,
        operation,
        is_destructive: !tally.destructive.is_empty(),
        destructive_operations: tally.destructive,
    }
}

/// `Schema::<op>(...)` facade calls.
fn scoped_call(n: Node<'_>, src: &str, tally: &mut Tally) {
    let Some(scope) = n.child_by_field_name("scope") else {
        return;
    };
    if text(scope, src) != "Schema" {
        return;
    }
    let Some(name) = n.child_by_field_name("name") else {
        return;
    };
    let args: Vec<Node<'_>> = n
        .child_by_field_name("arguments")
        .map(call_args)
        .unwrap_or_default();
    let first_string = args.first().and_then(|a| string_value(*a, src));
    let line = start_line(n);

    match text(name, src) {
        "create" => {
            tally.creates += 1;
            tally.table_name.get_or_insert_with(|| {
                first_string.clone().unwrap_or_default()
            });
        }
        "table" => {
            tally.alters += 1;
            if let Some(t) = first_string.clone() {
                tally.table_name.get_or_insert(t);
            }
        }
        "drop" | "dropIfExists" => {
            tally.table_drops += 1;
            if let Some(t) = first_string.clone() {
                tally.table_name.get_or_insert(t.clone());
            }
            tally.destructive.push(DestructiveOp {
                op: DestructiveKind::DropTable,
                target: first_string,
                line,
            });
        }
        "rename" => {
            tally.renames += 1;
            tally.destructive.push(DestructiveOp {
                op: DestructiveKind::RenameTable,
                target: first_string,
                line,
            });
        }
        // `Schema::dropColumn('table', 'col', ...)`: table first, columns after.
        "dropColumn" => {
            let mut strings = args.iter().filter_map(|a| string_value(*a, src));
            let _table = strings.next();
            let mut pushed = false;
            for col in strings {
                pushed = true;
                tally.destructive.push(DestructiveOp {
                    op: DestructiveKind::DropColumn,
                    target: Some(col),
                    line,
                });
            }
            if !pushed {
                tally.destructive.push(DestructiveOp {
                    op: DestructiveKind::DropColumn,
                    target: None,
                    line,
                });
            }
        }
        "renameColumn" => {
            tally.renames += 1;
            let from = args.get(1).and_then(|a| string_value(*a, src));
            tally.destructive.push(DestructiveOp {
                op: DestructiveKind::RenameColumn,
                target: from,
                line,
            });
        }
        _ => {}
    }
}

/// `$table->dropColumn(...)` / `$table->renameColumn(...)` builder calls.
fn member_call(n: Node<'_>, src: &str, tally: &mut Tally) {
    let Some(name) = n.child_by_field_name("name") else {
        return;
    };
    let args: Vec<Node<'_>> = n
        .child_by_field_name("arguments")
        .map(call_args)
        .unwrap_or_default();
    let line = start_line(n);

    match text(name, src) {
        "dropColumn" => {
            // String or array form; one entry per named column.
            let columns: Vec<String> = args.iter().flat_map(|a| strings_of(*a, src)).collect();
            if columns.is_empty() {
                tally.destructive.push(DestructiveOp {
                    op: DestructiveKind::DropColumn,
                    target: None,
                    line,
                });
            }
            for col in columns {
                tally.destructive.push(DestructiveOp {
                    op: DestructiveKind::DropColumn,
                    target: Some(col),
                    line,
                });
            }
        }
        "renameColumn" => {
            tally.renames += 1;
            let from = args.first().and_then(|a| string_value(*a, src));
            tally.destructive.push(DestructiveOp {
                op: DestructiveKind::RenameColumn,
                target: from,
                line,
            });
        }
        _ => {}
    }
}
