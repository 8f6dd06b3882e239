use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{errors::SGError, storage::grid_point::{unit_position, MAX_LEVEL}, utilities::token_reader::TokenReader};

///
/// Monotone map applied before the uniform subdivision of an analytic
/// stretching: nodes are uniform in `forward(x)` space.
///
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StretchingTransform
{
    Identity,
    Log,
    Sinh { x0: f64, xsi: f64 },
}

impl StretchingTransform
{
    pub fn name(&self) -> &'static str
    {
        match self
        {
            StretchingTransform::Identity => "id",
            StretchingTransform::Log => "log",
            StretchingTransform::Sinh { .. } => "sinh",
        }
    }

    #[inline]
    fn forward(&self, x: f64) -> f64
    {
        match *self
        {
            StretchingTransform::Identity => x,
            StretchingTransform::Log => x.ln(),
            StretchingTransform::Sinh { x0, xsi } => ((x - x0) / xsi).asinh(),
        }
    }

    #[inline]
    fn inverse(&self, y: f64) -> f64
    {
        match *self
        {
            StretchingTransform::Identity => y,
            StretchingTransform::Log => y.exp(),
            StretchingTransform::Sinh { x0, xsi } => x0 + xsi * y.sinh(),
        }
    }

    fn parameters(&self) -> (f64, f64)
    {
        match *self
        {
            StretchingTransform::Sinh { x0, xsi } => (x0, xsi),
            _ => (0.0, 0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticStretching1D
{
    pub lower: f64,
    pub upper: f64,
    pub dirichlet_lower: bool,
    pub dirichlet_upper: bool,
    pub transform: StretchingTransform,
}

impl AnalyticStretching1D
{
    pub fn new(lower: f64, upper: f64, transform: StretchingTransform) -> Result<Self, SGError>
    {
        if !(lower < upper)
        {
            return Err(SGError::InvalidStretching(format!("lower bound {lower} must be below upper bound {upper}")));
        }
        match transform
        {
            StretchingTransform::Log if lower <= 0.0 =>
                return Err(SGError::InvalidStretching(format!("log stretching needs a positive lower bound, got {lower}"))),
            StretchingTransform::Sinh { xsi, .. } if !(xsi > 0.0) =>
                return Err(SGError::InvalidStretching(format!("sinh stretching needs a positive xsi, got {xsi}"))),
            _ => {}
        }
        Ok(Self { lower, upper, dirichlet_lower: false, dirichlet_upper: false, transform })
    }

    pub fn coordinate(&self, level: u8, index: u32) -> f64
    {
        let u = unit_position(level, index);
        if u <= 0.0
        {
            return self.lower;
        }
        if u >= 1.0
        {
            return self.upper;
        }
        let a = self.transform.forward(self.lower);
        let b = self.transform.forward(self.upper);
        self.transform.inverse(a + (b - a) * u)
    }
}

///
/// Explicit node sequence for one dimension. The sequence holds the nodes of
/// level `max_level` (`2^max_level + 1` values, boundaries included).
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscreteStretching1D
{
    nodes: Vec<f64>,
    max_level: u8,
    pub dirichlet_lower: bool,
    pub dirichlet_upper: bool,
}

impl DiscreteStretching1D
{
    pub fn new(nodes: Vec<f64>) -> Result<Self, SGError>
    {
        let intervals = nodes.len().saturating_sub(1);
        if intervals == 0 || !intervals.is_power_of_two()
        {
            return Err(SGError::InvalidStretching(format!("discrete stretching needs 2^L + 1 nodes, got {}", nodes.len())));
        }
        let max_level = intervals.trailing_zeros() as u8;
        if max_level > MAX_LEVEL
        {
            return Err(SGError::InvalidStretching(format!("discrete stretching deeper than level {MAX_LEVEL}")));
        }
        if nodes.iter().any(|x| !x.is_finite()) || nodes.windows(2).any(|w| !(w[0] < w[1]))
        {
            return Err(SGError::InvalidStretching("discrete stretching nodes must be finite and strictly increasing".to_owned()));
        }
        Ok(Self { nodes, max_level, dirichlet_lower: false, dirichlet_upper: false })
    }

    pub fn nodes(&self) -> &[f64]
    {
        &self.nodes
    }

    pub fn max_level(&self) -> u8
    {
        self.max_level
    }

    pub fn lower(&self) -> f64
    {
        self.nodes[0]
    }

    pub fn upper(&self) -> f64
    {
        self.nodes[self.nodes.len() - 1]
    }

    ///
    /// Levels deeper than the table interpolate linearly between the two
    /// bracketing nodes of the finest level.
    ///
    pub fn coordinate(&self, level: u8, index: u32) -> f64
    {
        let index = index as u64;
        if level <= self.max_level
        {
            return self.nodes[(index << (self.max_level - level)) as usize];
        }
        let shift = level - self.max_level;
        let left = index >> shift;
        let remainder = index - (left << shift);
        if remainder == 0
        {
            return self.nodes[left as usize];
        }
        let t = remainder as f64 / (1_u64 << shift) as f64;
        let a = self.nodes[left as usize];
        let b = self.nodes[left as usize + 1];
        a + (b - a) * t
    }
}

///
/// Non-uniform coordinate system. Either every dimension is generated by an
/// analytic transform or every dimension is an explicit node sequence.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stretching
{
    Analytic(Vec<AnalyticStretching1D>),
    Discrete(Vec<DiscreteStretching1D>),
}

impl Stretching
{
    pub fn dimension(&self) -> usize
    {
        match self
        {
            Stretching::Analytic(dims) => dims.len(),
            Stretching::Discrete(dims) => dims.len(),
        }
    }

    pub fn is_discrete(&self) -> bool
    {
        matches!(self, Stretching::Discrete(_))
    }

    #[inline]
    pub fn coordinate(&self, dim: usize, level: u8, index: u32) -> f64
    {
        match self
        {
            Stretching::Analytic(dims) => dims[dim].coordinate(level, index),
            Stretching::Discrete(dims) => dims[dim].coordinate(level, index),
        }
    }

    pub fn lower(&self, dim: usize) -> f64
    {
        match self
        {
            Stretching::Analytic(dims) => dims[dim].lower,
            Stretching::Discrete(dims) => dims[dim].lower(),
        }
    }

    pub fn upper(&self, dim: usize) -> f64
    {
        match self
        {
            Stretching::Analytic(dims) => dims[dim].upper,
            Stretching::Discrete(dims) => dims[dim].upper(),
        }
    }

    pub fn dirichlet(&self, dim: usize) -> (bool, bool)
    {
        match self
        {
            Stretching::Analytic(dims) => (dims[dim].dirichlet_lower, dims[dim].dirichlet_upper),
            Stretching::Discrete(dims) => (dims[dim].dirichlet_lower, dims[dim].dirichlet_upper),
        }
    }

    ///
    /// Analytic: `lower upper dirichlet_lower dirichlet_upper kind x0 xsi` per
    /// dimension. Discrete: `dirichlet_lower dirichlet_upper n v_0 ... v_{n-1}`.
    ///
    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), SGError>
    {
        match self
        {
            Stretching::Analytic(dims) =>
            {
                for s in dims
                {
                    let (x0, xsi) = s.transform.parameters();
                    writeln!(writer, "{} {} {} {} {} {} {}", s.lower, s.upper, s.dirichlet_lower as u8, s.dirichlet_upper as u8, s.transform.name(), x0, xsi)?;
                }
            }
            Stretching::Discrete(dims) =>
            {
                for s in dims
                {
                    write!(writer, "{} {} {}", s.dirichlet_lower as u8, s.dirichlet_upper as u8, s.nodes.len())?;
                    for x in &s.nodes
                    {
                        write!(writer, " {x}")?;
                    }
                    writeln!(writer)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn read_analytic<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize) -> Result<Self, SGError>
    {
        let mut dims = Vec::with_capacity(dimension);
        for _ in 0..dimension
        {
            let lower: f64 = reader.parse("stretching lower bound")?;
            let upper: f64 = reader.parse("stretching upper bound")?;
            let dirichlet_lower = reader.parse_flag("stretching dirichlet flag")?;
            let dirichlet_upper = reader.parse_flag("stretching dirichlet flag")?;
            let kind = reader.next_token("stretching kind")?.to_owned();
            let x0: f64 = reader.parse("stretching x0")?;
            let xsi: f64 = reader.parse("stretching xsi")?;
            let transform = match kind.as_str()
            {
                "id" => StretchingTransform::Identity,
                "log" => StretchingTransform::Log,
                "sinh" => StretchingTransform::Sinh { x0, xsi },
                _ => return Err(SGError::UnknownStretchingKind(kind)),
            };
            let mut s = AnalyticStretching1D::new(lower, upper, transform)?;
            s.dirichlet_lower = dirichlet_lower;
            s.dirichlet_upper = dirichlet_upper;
            dims.push(s);
        }
        Ok(Stretching::Analytic(dims))
    }

    pub(crate) fn read_discrete<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize) -> Result<Self, SGError>
    {
        let mut dims = Vec::with_capacity(dimension);
        for _ in 0..dimension
        {
            let dirichlet_lower = reader.parse_flag("stretching dirichlet flag")?;
            let dirichlet_upper = reader.parse_flag("stretching dirichlet flag")?;
            let n: usize = reader.parse("stretching node count")?;
            let nodes = (0..n).map(|_| reader.parse::<f64>("stretching node")).collect::<Result<Vec<_>, _>>()?;
            let mut s = DiscreteStretching1D::new(nodes)?;
            s.dirichlet_lower = dirichlet_lower;
            s.dirichlet_upper = dirichlet_upper;
            dims.push(s);
        }
        Ok(Stretching::Discrete(dims))
    }
}
