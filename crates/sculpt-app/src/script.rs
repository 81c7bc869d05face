//! 套索脚本
//!
//! 每行一个交互，`#` 开头为注释：
//!
//! ```text
//! enable
//! click 100,100
//! click @50,0
//! drag 200,200
//! release
//! validate
//! ```
//!
//! `click`/`move`/`drag` 接受绝对坐标 `x,y` 或相对上一个指针位置的 `@dx,dy`；
//! 其它单词按命令交给工具（`enable`、`validate`、`undo`、`delete`、`reset` 等）。

use anyhow::{bail, Context, Result};
use sculpt_core::input_parser::InputParser;
use sculpt_core::math::Point2;
use sculpt_ui::{Action, ActionContext, ActionResult, MouseButton, ShapeExtruder};

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// 左键按下并释放
    Click(Point2),
    /// 右键按下（删除最后一段）
    RightClick,
    /// 无按键移动
    Move(Point2),
    /// 按住左键移动
    Drag(Point2),
    Release,
    DoubleClick,
    Command(String),
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    let mut pointer: Option<Point2> = None;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let number = index + 1;
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let word = word.to_ascii_lowercase();

        let step = match word.as_str() {
            "click" | "move" | "drag" => {
                let point = InputParser::parse_point(rest, pointer)
                    .with_context(|| format!("line {}: invalid point '{}'", number, rest))?;
                pointer = Some(point);
                match word.as_str() {
                    "click" => ScriptStep::Click(point),
                    "move" => ScriptStep::Move(point),
                    _ => ScriptStep::Drag(point),
                }
            }
            "rclick" => ScriptStep::RightClick,
            "release" => ScriptStep::Release,
            "dblclick" => ScriptStep::DoubleClick,
            _ if rest.is_empty() => ScriptStep::Command(word),
            _ => bail!("line {}: unexpected argument '{}' for '{}'", number, rest, word),
        };
        steps.push(step);
    }

    Ok(steps)
}

/// 回放脚本，返回生成的网格数
pub fn replay(
    steps: &[ScriptStep],
    extruder: &mut ShapeExtruder,
    ctx: &mut ActionContext,
) -> Result<usize> {
    let mut pointer = Point2::origin();
    let mut created = 0;

    for step in steps {
        let result = match step {
            ScriptStep::Click(point) => {
                pointer = *point;
                extruder.on_button_press(ctx, MouseButton::Left, point.x, point.y);
                extruder.on_button_release(ctx, MouseButton::Left, point.x, point.y)
            }
            ScriptStep::RightClick => {
                extruder.on_button_press(ctx, MouseButton::Right, pointer.x, pointer.y)
            }
            ScriptStep::Move(point) => {
                pointer = *point;
                extruder.on_mouse_move(ctx, None, point.x, point.y)
            }
            ScriptStep::Drag(point) => {
                pointer = *point;
                extruder.on_mouse_move(ctx, Some(MouseButton::Left), point.x, point.y)
            }
            ScriptStep::Release => {
                extruder.on_button_release(ctx, MouseButton::Left, pointer.x, pointer.y)
            }
            ScriptStep::DoubleClick => {
                extruder.on_double_click(ctx, MouseButton::Left, pointer.x, pointer.y)
            }
            ScriptStep::Command(name) => extruder
                .on_command(ctx, name)
                .with_context(|| format!("Unknown command '{}'", name))?,
        };

        if let ActionResult::Validated(Some(reconstruction)) = result {
            tracing::debug!("{} created", reconstruction.organ_name);
            created += 1;
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sculpt_core::camera::PerspectiveCamera;
    use sculpt_core::model_series::ModelSeries;

    const SQUARE: &str = "
        # square
        enable
        click 0,0
        click @10,0
        click @0,10
        click @-10,0
        validate
    ";

    #[test]
    fn test_parse_relative_points() {
        let steps = parse_script(SQUARE).unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], ScriptStep::Command("enable".to_string()));
        assert_eq!(steps[3], ScriptStep::Click(Point2::new(10.0, 10.0)));
        assert_eq!(steps[4], ScriptStep::Click(Point2::new(0.0, 10.0)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_script("click 1;2").is_err());
        assert!(parse_script("click @1,1").is_err());
        assert!(parse_script("validate now").is_err());
        assert_eq!(
            parse_script("DRAG 3,4\nRelease").unwrap(),
            vec![ScriptStep::Drag(Point2::new(3.0, 4.0)), ScriptStep::Release]
        );
    }

    #[test]
    fn test_replay_square() {
        let camera = PerspectiveCamera::default();
        let mut models = ModelSeries::new();
        let mut extruder = ShapeExtruder::default();
        let mut ctx = ActionContext::new(&camera, &mut models);

        let created = replay(&parse_script(SQUARE).unwrap(), &mut extruder, &mut ctx).unwrap();
        assert_eq!(created, 1);
        assert_eq!(models.len(), 1);
        assert_eq!(models.reconstructions()[0].mesh.cell_count(), 12);
    }

    #[test]
    fn test_replay_unknown_command() {
        let camera = PerspectiveCamera::default();
        let mut models = ModelSeries::new();
        let mut extruder = ShapeExtruder::default();
        let mut ctx = ActionContext::new(&camera, &mut models);

        let steps = parse_script("enable\nexplode").unwrap();
        assert!(replay(&steps, &mut extruder, &mut ctx).is_err());
    }
}
