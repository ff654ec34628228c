#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl InfixOp {
    /// Left and right binding power; every level is left-associative.
    pub fn binding_power(&self) -> (u8, u8) {
        let level = match self {
            InfixOp::Logical(LogicalOp::Or) => 1,
            InfixOp::Logical(LogicalOp::And) => 2,
            InfixOp::Binary(op) => match op {
                BinaryOp::Eq | BinaryOp::Ne | BinaryOp::StrictEq | BinaryOp::StrictNe => 3,
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
                BinaryOp::Add | BinaryOp::Sub => 5,
                BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
            },
        };
        (level * 2 - 1, level * 2)
    }

    pub fn build(self, lhs: Expr, rhs: Expr) -> Expr {
        match self {
            InfixOp::Binary(op) => Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
            InfixOp::Logical(op) => Expr::Logical(op, Box::new(lhs), Box::new(rhs)),
        }
    }
}
