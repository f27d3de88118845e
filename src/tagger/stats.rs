use crate::rule::{Rule, TemplateId, TemplateRegistry};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error counts before and after applying a list of rules to a corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub token_count: usize,
    pub sequence_count: usize,
    /// Number of templates rules were learned from. Only known for training data.
    pub template_count: Option<usize>,
    pub initial_errors: usize,
    pub final_errors: usize,
    /// The decrease in errors caused by each rule, in rule order.
    pub rule_scores: Vec<i64>,
    pub min_score: Option<i64>,
    pub min_acc: Option<f64>,
}

impl Stats {
    fn accuracy(&self, errors: usize) -> f64 {
        if self.token_count == 0 {
            return 1.0;
        }

        1.0 - errors as f64 / self.token_count as f64
    }

    pub fn initial_accuracy(&self) -> f64 {
        self.accuracy(self.initial_errors)
    }

    pub fn final_accuracy(&self) -> f64 {
        self.accuracy(self.final_errors)
    }

    fn summary(&self) -> String {
        format!(
            "({:7} tokens) initial {:5} {:.4} final: {:5} {:.4}",
            self.token_count,
            self.initial_errors,
            self.initial_accuracy(),
            self.final_errors,
            self.final_accuracy()
        )
    }
}

/// The contribution of one template to a rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub id: TemplateId,
    pub template: String,
    pub rule_count: usize,
    pub train_score: i64,
    pub test_score: Option<i64>,
}

/// Per-template scores of a rule list. Printable as a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateStatistics {
    train: Stats,
    test: Option<Stats>,
    rule_count: usize,
    rows: Vec<TemplateRow>,
    unused: Vec<(TemplateId, String)>,
    show_unused: bool,
}

fn ratio(a: i64, b: i64) -> f64 {
    if b == 0 {
        0.0
    } else {
        a as f64 / b as f64
    }
}

impl TemplateStatistics {
    pub(crate) fn new(
        rules: &[Rule],
        templates: &TemplateRegistry,
        train: Stats,
        test: Option<Stats>,
    ) -> Self {
        let mut rows: FnvHashMap<TemplateId, TemplateRow> = FnvHashMap::default();

        for (i, rule) in rules.iter().enumerate() {
            let row = rows.entry(rule.template_id()).or_insert_with(|| TemplateRow {
                id: rule.template_id(),
                template: templates
                    .get(rule.template_id())
                    .map_or_else(|| "<unknown>".to_string(), |x| x.to_string()),
                rule_count: 0,
                train_score: 0,
                test_score: test.as_ref().map(|_| 0),
            });

            row.rule_count += 1;
            row.train_score += train.rule_scores.get(i).copied().unwrap_or(0);
            if let Some(test) = &test {
                *row.test_score.get_or_insert(0) += test.rule_scores.get(i).copied().unwrap_or(0);
            }
        }

        let mut rows: Vec<TemplateRow> = rows.into_iter().map(|(_, row)| row).collect();
        // highest score first, ties broken by id descending
        rows.sort_by(|a, b| {
            let key = |x: &TemplateRow| (x.test_score.unwrap_or(x.train_score), x.id);
            key(b).cmp(&key(a))
        });

        let unused = templates
            .iter()
            .filter(|template| !rows.iter().any(|row| row.id == template.id()))
            .map(|template| (template.id(), template.to_string()))
            .collect();

        TemplateStatistics {
            train,
            test,
            rule_count: rules.len(),
            rows,
            unused,
            show_unused: true,
        }
    }

    /// Do not list unused templates when printing.
    pub fn hide_unused(mut self) -> Self {
        self.show_unused = false;
        self
    }

    /// Rows sorted by score, highest first.
    pub fn rows(&self) -> &[TemplateRow] {
        &self.rows
    }

    pub fn unused(&self) -> &[(TemplateId, String)] {
        &self.unused
    }
}

impl fmt::Display for TemplateStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_train: i64 = self.train.rule_scores.iter().sum();
        let rule_count = self.rule_count as f64;
        let rule_share = |count: usize| {
            if self.rule_count == 0 {
                0.0
            } else {
                count as f64 / rule_count
            }
        };

        match &self.test {
            None => {
                writeln!(
                    f,
                    "TEMPLATE STATISTICS (TRAIN)  {} templates, {} rules)",
                    self.rows.len(),
                    self.rule_count
                )?;
                writeln!(f, "TRAIN {}", self.train.summary())?;

                let head = "#ID | Score (train) |  #Rules     | Template";
                writeln!(f, "{}\n{}", head, "-".repeat(head.len()))?;

                for row in &self.rows {
                    writeln!(
                        f,
                        "{} | {:5}   {:5.3} |{:4}   {:.3} | {}",
                        row.id,
                        row.train_score,
                        ratio(row.train_score, total_train),
                        row.rule_count,
                        rule_share(row.rule_count),
                        row.template
                    )?;
                }
            }
            Some(test) => {
                let total_test: i64 = test.rule_scores.iter().sum();

                writeln!(
                    f,
                    "TEMPLATE STATISTICS (TEST AND TRAIN) ({} templates, {} rules)",
                    self.rows.len(),
                    self.rule_count
                )?;
                writeln!(f, "TEST  {} ", test.summary())?;
                writeln!(f, "TRAIN {} ", self.train.summary())?;

                let head = "#ID | Score (test) | Score (train) |  #Rules     | Template";
                writeln!(f, "{}\n{}", head, "-".repeat(head.len()))?;

                for row in &self.rows {
                    let test_score = row.test_score.unwrap_or(0);

                    writeln!(
                        f,
                        "{} |{:5}  {:6.3} |  {:4}   {:.3} |{:4}   {:.3} | {}",
                        row.id,
                        test_score,
                        ratio(test_score, total_test),
                        row.train_score,
                        ratio(row.train_score, total_train),
                        row.rule_count,
                        rule_share(row.rule_count),
                        row.template
                    )?;
                }
            }
        }
        writeln!(f)?;

        if self.show_unused {
            writeln!(f, "UNUSED TEMPLATES ({})", self.unused.len())?;
            for (id, template) in &self.unused {
                writeln!(f, "{} {}", id, template)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
