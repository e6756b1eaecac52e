use std::collections::BTreeMap;

use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, metrics};

/// Rename columns in every row, summary row and owned subtables included.
///
/// `mapping` is an object of old to new names; without it legacy numeric
/// keys are turned into metric names (`"2"` to `nb_visits`). A column
/// already present under the new name is kept as is.
pub struct ReplaceColumnNames;

impl ReplaceColumnNames {
    pub const NAME: &'static str = "ReplaceColumnNames";
}

impl Filter for ReplaceColumnNames {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let mapping = match args.opt_object("mapping")? {
            Some(map) => Some(
                map.iter()
                    .map(|(from, to)| {
                        to.as_str()
                            .map(|to| (from.clone(), to.to_string()))
                            .ok_or_else(|| FilterError::InvalidArgument {
                                arg: "mapping".to_string(),
                                reason: format!("new name for '{}' must be a string", from),
                            })
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()?,
            ),
            None => None,
        };

        rename(table, mapping.as_ref());
        Ok(())
    }
}

fn rename(table: &mut DataTable, mapping: Option<&BTreeMap<String, String>>) {
    for row in table.rows_mut() {
        let renames: Vec<(String, String)> = row
            .columns()
            .keys()
            .filter_map(|name| {
                let target = match mapping {
                    Some(mapping) => mapping.get(name).cloned(),
                    None => metrics::name_for_index(name).map(str::to_string),
                };
                target.map(|to| (name.clone(), to))
            })
            .collect();
        for (from, to) in renames {
            row.rename_column(&from, &to);
        }
    }
    for subtable in table.subtables_mut() {
        rename(subtable, mapping);
    }
}
