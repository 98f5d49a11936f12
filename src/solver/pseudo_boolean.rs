// Pseudo-boolean constraints over 0/1 variables, encoded to CNF
//
// A row `sum a_i * x_i {<=,=,>=} k` with integer coefficients is rewritten
// as one or two `sum w_i * l_i <= k'` rows with positive weights over
// literals. Small rows go through a reduced, memoised decision diagram;
// rows whose diagram would pass DIAGRAM_NODE_LIMIT are summed with a
// binary adder network and compared against the bound bit by bit.

use std::collections::{HashMap, VecDeque};

use varisat::{ExtendFormula, Lit, Var};

use crate::domain::value_objects::Operator;

/// Largest decision diagram built before switching to the adder network.
pub const DIAGRAM_NODE_LIMIT: usize = 20_000;

/// Normalised row `sum weight * literal <= bound`, weights strictly positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtMost {
    pub terms: Vec<(i64, Lit)>,
    pub bound: i64,
}

impl AtMost {
    /// `sum coefficient * var <= bound` over positive literals of `var`.
    pub fn new(terms: &[(i64, Var)], bound: i64) -> Self {
        // merge repeated variables
        let mut merged: Vec<(Var, i64)> = Vec::with_capacity(terms.len());
        let mut slot: HashMap<Var, usize> = HashMap::with_capacity(terms.len());
        for &(coefficient, var) in terms {
            match slot.get(&var) {
                Some(&at) => merged[at].1 = merged[at].1.saturating_add(coefficient),
                None => {
                    slot.insert(var, merged.len());
                    merged.push((var, coefficient));
                }
            }
        }

        // a*x with a < 0 equals a + |a|*(not x)
        let mut bound = bound;
        let mut normalised = Vec::with_capacity(merged.len());
        for (var, coefficient) in merged {
            if coefficient > 0 {
                normalised.push((coefficient, var.positive()));
            } else if coefficient < 0 {
                bound = bound.saturating_sub(coefficient);
                normalised.push((coefficient.saturating_neg(), var.negative()));
            }
        }

        // heavy terms first keeps the diagram small
        normalised.sort_by(|a, b| b.0.cmp(&a.0));
        Self {
            terms: normalised,
            bound,
        }
    }

    /// Rows equivalent to `sum coefficient * var <operator> rhs`.
    pub fn from_relation(terms: &[(i64, Var)], operator: Operator, rhs: i64) -> Vec<Self> {
        let negated: Vec<(i64, Var)> = terms
            .iter()
            .map(|&(c, v)| (c.saturating_neg(), v))
            .collect();
        match operator {
            Operator::Le => vec![Self::new(terms, rhs)],
            Operator::Ge => vec![Self::new(&negated, rhs.saturating_neg())],
            Operator::Eq => vec![
                Self::new(terms, rhs),
                Self::new(&negated, rhs.saturating_neg()),
            ],
        }
    }

    pub fn is_trivially_true(&self) -> bool {
        self.total() <= self.bound
    }

    pub fn is_trivially_false(&self) -> bool {
        self.bound < 0
    }

    fn total(&self) -> i64 {
        self.terms
            .iter()
            .fold(0i64, |sum, &(w, _)| sum.saturating_add(w))
    }
}

/// Add clauses enforcing `row` to `formula`. Returns the number of
/// auxiliary variables introduced.
pub fn encode<F: ExtendFormula>(formula: &mut F, row: &AtMost) -> usize {
    encode_with_limit(formula, row, DIAGRAM_NODE_LIMIT)
}

/// [`encode`] with an explicit diagram size limit; `0` always uses the
/// adder network.
pub fn encode_with_limit<F: ExtendFormula>(
    formula: &mut F,
    row: &AtMost,
    node_limit: usize,
) -> usize {
    if row.is_trivially_false() {
        add_contradiction(formula);
        return 0;
    }
    if row.is_trivially_true() {
        return 0;
    }

    match Diagram::build(row, node_limit) {
        Some(diagram) => diagram.emit(formula),
        None => encode_adder(formula, row),
    }
}

fn add_contradiction<F: ExtendFormula>(formula: &mut F) {
    let lit = formula.new_lit();
    formula.add_clause(&[lit]);
    formula.add_clause(&[!lit]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    True,
    False,
    Inner(usize),
}

#[derive(Debug, Clone, Copy)]
struct Branch {
    lit: Lit,
    high: Node,
    low: Node,
}

/// Decision diagram of "terms i.. sum to at most k", built in memory so an
/// oversized one can be dropped before touching the formula. Children are
/// stored before their parents.
struct Diagram {
    nodes: Vec<Branch>,
    root: Node,
}

struct Builder<'a> {
    terms: &'a [(i64, Lit)],
    suffix: Vec<i64>,
    memo: HashMap<(usize, i64), Node>,
    nodes: Vec<Branch>,
    limit: usize,
}

impl Diagram {
    fn build(row: &AtMost, limit: usize) -> Option<Self> {
        // suffix[i] = total weight of terms i..
        let mut suffix = vec![0i64; row.terms.len() + 1];
        for i in (0..row.terms.len()).rev() {
            suffix[i] = suffix[i + 1].saturating_add(row.terms[i].0);
        }

        let mut builder = Builder {
            terms: &row.terms,
            suffix,
            memo: HashMap::new(),
            nodes: Vec::new(),
            limit,
        };
        let root = builder.node(0, row.bound)?;
        Some(Self {
            nodes: builder.nodes,
            root,
        })
    }

    // Clauses only force the node-implies-constraint direction, which is
    // all the root unit clause needs.
    fn emit<F: ExtendFormula>(&self, formula: &mut F) -> usize {
        let mut lits: Vec<Lit> = Vec::with_capacity(self.nodes.len());
        for branch in &self.nodes {
            let n = formula.new_lit();
            // n and lit -> high
            match branch.high {
                Node::True => {}
                Node::False => formula.add_clause(&[!n, !branch.lit]),
                Node::Inner(h) => formula.add_clause(&[!n, !branch.lit, lits[h]]),
            }
            // n -> low
            match branch.low {
                Node::True => {}
                Node::False => formula.add_clause(&[!n]),
                Node::Inner(l) => formula.add_clause(&[!n, lits[l]]),
            }
            lits.push(n);
        }

        match self.root {
            Node::True => {}
            Node::False => add_contradiction(formula),
            Node::Inner(root) => formula.add_clause(&[lits[root]]),
        }
        self.nodes.len()
    }
}

impl Builder<'_> {
    // None once the memo table outgrows the limit
    fn node(&mut self, i: usize, k: i64) -> Option<Node> {
        if k < 0 {
            return Some(Node::False);
        }
        if self.suffix[i] <= k {
            return Some(Node::True);
        }
        if let Some(&node) = self.memo.get(&(i, k)) {
            return Some(node);
        }
        if self.memo.len() >= self.limit {
            return None;
        }

        let (weight, lit) = self.terms[i];
        let high = self.node(i + 1, k - weight)?;
        let low = self.node(i + 1, k)?;

        let node = if high == low {
            high
        } else {
            self.nodes.push(Branch { lit, high, low });
            Node::Inner(self.nodes.len() - 1)
        };

        self.memo.insert((i, k), node);
        Some(node)
    }
}

/// Sum the weighted literals into binary with full and half adders, then
/// forbid every output above `row.bound`. Clause count grows with the
/// number of terms times the bit width of the weights.
fn encode_adder<F: ExtendFormula>(formula: &mut F, row: &AtMost) -> usize {
    let mut columns: Vec<VecDeque<Lit>> = Vec::new();
    for &(weight, lit) in &row.terms {
        for bit in 0..63 {
            if weight >> bit & 1 == 1 {
                if columns.len() <= bit {
                    columns.resize_with(bit + 1, VecDeque::new);
                }
                columns[bit].push_back(lit);
            }
        }
    }

    let mut created = 0;
    let mut sum: Vec<Option<Lit>> = Vec::with_capacity(columns.len() + 1);
    let mut bit = 0;
    while bit < columns.len() {
        while columns[bit].len() >= 2 {
            let a = columns[bit].pop_front();
            let b = columns[bit].pop_front();
            let c = columns[bit].pop_front();
            let (Some(a), Some(b)) = (a, b) else { break };

            let (s, carry) = match c {
                Some(c) => full_adder(formula, a, b, c),
                None => half_adder(formula, a, b),
            };
            created += 2;
            columns[bit].push_back(s);
            if columns.len() <= bit + 1 {
                columns.push(VecDeque::new());
            }
            columns[bit + 1].push_back(carry);
        }
        sum.push(columns[bit].pop_front());
        bit += 1;
    }

    // sum > bound iff at the highest differing bit the sum has a 1 and the
    // bound a 0; bits above the bound's width are all 0 in the bound
    let bound_bit = |i: usize| i < 63 && row.bound >> i & 1 == 1;
    for j in 0..sum.len() {
        let Some(o) = sum[j] else { continue };
        if bound_bit(j) {
            continue;
        }
        let mut clause = vec![!o];
        let mut satisfied = false;
        for i in j + 1..sum.len() {
            if bound_bit(i) {
                match sum[i] {
                    Some(higher) => clause.push(!higher),
                    None => satisfied = true,
                }
            }
        }
        // a bound bit above the sum's width is never matched
        if (sum.len()..63).any(bound_bit) {
            satisfied = true;
        }
        if !satisfied {
            formula.add_clause(&clause);
        }
    }
    created
}

// s <-> a xor b xor c, carry <-> at least two of a, b, c
fn full_adder<F: ExtendFormula>(formula: &mut F, a: Lit, b: Lit, c: Lit) -> (Lit, Lit) {
    let s = formula.new_lit();
    let carry = formula.new_lit();
    formula.add_clause(&[!a, !b, !c, s]);
    formula.add_clause(&[!a, b, c, s]);
    formula.add_clause(&[a, !b, c, s]);
    formula.add_clause(&[a, b, !c, s]);
    formula.add_clause(&[a, b, c, !s]);
    formula.add_clause(&[a, !b, !c, !s]);
    formula.add_clause(&[!a, b, !c, !s]);
    formula.add_clause(&[!a, !b, c, !s]);

    formula.add_clause(&[!a, !b, carry]);
    formula.add_clause(&[!a, !c, carry]);
    formula.add_clause(&[!b, !c, carry]);
    formula.add_clause(&[a, b, !carry]);
    formula.add_clause(&[a, c, !carry]);
    formula.add_clause(&[b, c, !carry]);
    (s, carry)
}

// s <-> a xor b, carry <-> a and b
fn half_adder<F: ExtendFormula>(formula: &mut F, a: Lit, b: Lit) -> (Lit, Lit) {
    let s = formula.new_lit();
    let carry = formula.new_lit();
    formula.add_clause(&[!a, !b, !s]);
    formula.add_clause(&[a, b, !s]);
    formula.add_clause(&[!a, b, s]);
    formula.add_clause(&[a, !b, s]);

    formula.add_clause(&[!a, !b, carry]);
    formula.add_clause(&[a, !carry]);
    formula.add_clause(&[b, !carry]);
    (s, carry)
}
