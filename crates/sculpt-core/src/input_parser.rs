//! 屏幕坐标输入解析
//!
//! 套索脚本中的点位格式：
//! - 绝对坐标: `120,80`
//! - 相对坐标: `@10,-5`（相对上一个点）
//!
//! 坐标单位为视口像素。

use crate::math::Point2;
use thiserror::Error;

/// 解析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Missing value: {0}")]
    MissingValue(String),
}

/// 点位解析器
pub struct InputParser;

impl InputParser {
    /// 解析一个点
    ///
    /// 相对坐标需要 `reference_point`。
    pub fn parse_point(input: &str, reference_point: Option<Point2>) -> Result<Point2, ParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::MissingValue("Empty point".to_string()));
        }

        let (is_relative, body) = match input.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let (x_str, y_str) = body
            .split_once(',')
            .ok_or_else(|| ParseError::InvalidFormat(format!("Expected 'x,y', got '{}'", input)))?;

        let x = Self::parse_number(x_str, "X coordinate")?;
        let y = Self::parse_number(y_str, "Y coordinate")?;

        if !is_relative {
            return Ok(Point2::new(x, y));
        }

        let reference = reference_point.ok_or_else(|| {
            ParseError::MissingValue("Reference point required for relative coordinate".to_string())
        })?;
        Ok(Point2::new(reference.x + x, reference.y + y))
    }

    /// 解析以空白或分号分隔的点序列，相对坐标依次累加
    pub fn parse_points(input: &str) -> Result<Vec<Point2>, ParseError> {
        let mut points: Vec<Point2> = Vec::new();
        for token in input
            .split(|c: char| c.is_whitespace() || c == ';')
            .filter(|token| !token.is_empty())
        {
            let point = Self::parse_point(token, points.last().copied())?;
            points.push(point);
        }
        Ok(points)
    }

    fn parse_number(value: &str, what: &str) -> Result<f64, ParseError> {
        let value = value.trim();
        let number = value
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidFormat(format!("Invalid {}: {}", what, value)))?;

        if number.is_finite() {
            Ok(number)
        } else {
            Err(ParseError::InvalidFormat(format!("Non-finite {}: {}", what, value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_coordinate() {
        let point = InputParser::parse_point("100,50", None).unwrap();
        assert_eq!(point, Point2::new(100.0, 50.0));

        let point = InputParser::parse_point("  -1.5 , 2 ", None).unwrap();
        assert_eq!(point, Point2::new(-1.5, 2.0));
    }

    #[test]
    fn test_parse_relative_coordinate() {
        let point = InputParser::parse_point("@100,50", Some(Point2::new(10.0, 20.0))).unwrap();
        assert_eq!(point, Point2::new(110.0, 70.0));

        assert!(matches!(
            InputParser::parse_point("@1,1", None),
            Err(ParseError::MissingValue(_))
        ));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(InputParser::parse_point("", None), Err(ParseError::MissingValue(_))));
        assert!(matches!(InputParser::parse_point("100", None), Err(ParseError::InvalidFormat(_))));
        assert!(matches!(InputParser::parse_point("a,1", None), Err(ParseError::InvalidFormat(_))));
        assert!(matches!(InputParser::parse_point("1,inf", None), Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_point_sequence() {
        let points = InputParser::parse_points("0,0 @10,0; @0,10 0,10").unwrap();
        assert_eq!(
            points,
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ]
        );
        assert!(InputParser::parse_points("").unwrap().is_empty());
    }
}
