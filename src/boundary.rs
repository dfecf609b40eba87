use nalgebra::Vector2;

/// One of the four children of an internal node.
///
/// The y axis points down, so "north" is the half with the smaller y coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthWest = 2,
    SouthEast = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn is_north(self) -> bool {
        matches!(self, Quadrant::NorthWest | Quadrant::NorthEast)
    }

    #[must_use]
    pub fn is_west(self) -> bool {
        matches!(self, Quadrant::NorthWest | Quadrant::SouthWest)
    }

    fn from_halves(north: bool, west: bool) -> Self {
        match (north, west) {
            (true, true) => Quadrant::NorthWest,
            (true, false) => Quadrant::NorthEast,
            (false, true) => Quadrant::SouthWest,
            (false, false) => Quadrant::SouthEast,
        }
    }
}

/// An axis-aligned rectangle covering `[min, max)` on both axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundary {
    pub min: Vector2<f64>,
    pub max: Vector2<f64>,
}

impl Boundary {
    #[must_use]
    pub fn new(min: Vector2<f64>, max: Vector2<f64>) -> Self {
        Self { min, max }
    }

    /// Rectangle with its top-left corner at `(x, y)`.
    #[must_use]
    pub fn from_corner(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Vector2::new(x, y), Vector2::new(x + width, y + height))
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// The larger of width and height.
    #[must_use]
    pub fn extent(&self) -> f64 {
        self.width().max(self.height())
    }

    #[must_use]
    pub fn center(&self) -> Vector2<f64> {
        (self.min + self.max) / 2.
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
            && self.width() > 0.
            && self.height() > 0.
    }

    #[must_use]
    pub fn contains(&self, position: &Vector2<f64>) -> bool {
        self.min.x <= position.x
            && position.x < self.max.x
            && self.min.y <= position.y
            && position.y < self.max.y
    }

    /// The child rectangle for `quadrant`, split at the center.
    #[must_use]
    pub fn quadrant(&self, quadrant: Quadrant) -> Self {
        self.split_at(&self.center())[quadrant.index()]
    }

    /// Splits into four rectangles meeting at `point`, in [`Quadrant::ALL`]
    /// order. Neighbours share their edges exactly, so every position inside
    /// `self` lies in exactly one of them.
    #[must_use]
    pub fn split_at(&self, point: &Vector2<f64>) -> [Self; 4] {
        Quadrant::ALL.map(|quadrant| {
            let (min_x, max_x) = if quadrant.is_west() {
                (self.min.x, point.x)
            } else {
                (point.x, self.max.x)
            };
            let (min_y, max_y) = if quadrant.is_north() {
                (self.min.y, point.y)
            } else {
                (point.y, self.max.y)
            };
            Self::new(Vector2::new(min_x, min_y), Vector2::new(max_x, max_y))
        })
    }

    /// The corner of `self` facing the rest of a rectangle grown around it,
    /// given the `quadrant` `self` occupies there. Splitting the grown
    /// rectangle at this point reproduces `self` bit for bit.
    #[must_use]
    pub fn inner_corner(&self, quadrant: Quadrant) -> Vector2<f64> {
        Vector2::new(
            if quadrant.is_west() { self.max.x } else { self.min.x },
            if quadrant.is_north() { self.max.y } else { self.min.y },
        )
    }

    /// Doubles the rectangle towards `position`.
    ///
    /// Returns the grown rectangle and the quadrant `self` occupies in it. On
    /// each axis the new rectangle extends to the side the position left
    /// through, so `self` ends up on the opposite side.
    #[must_use]
    pub fn grow_towards(&self, position: &Vector2<f64>) -> (Self, Quadrant) {
        let (width, height) = (self.width(), self.height());
        let extend_west = position.x < self.min.x;
        let extend_north = position.y < self.min.y;

        let (min_x, max_x) = if extend_west {
            (self.min.x - width, self.max.x)
        } else {
            (self.min.x, self.max.x + width)
        };
        let (min_y, max_y) = if extend_north {
            (self.min.y - height, self.max.y)
        } else {
            (self.min.y, self.max.y + height)
        };

        (
            Self::new(Vector2::new(min_x, min_y), Vector2::new(max_x, max_y)),
            Quadrant::from_halves(!extend_north, !extend_west),
        )
    }
}
